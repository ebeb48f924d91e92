//! Contract for the local visual objects the sync engine reads and writes.
//!
//! The engine never creates or renders these; it only moves named fields in
//! and out of them.

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Well-known field names.
pub mod fields {
    /// Horizontal position.
    pub const X: &str = "x";
    /// Vertical position.
    pub const Y: &str = "y";
    /// Rotation in radians.
    pub const ROTATION: &str = "rotation";
    /// Opacity (0.0 to 1.0).
    pub const ALPHA: &str = "alpha";
    /// Horizontal scale.
    pub const SCALE_X: &str = "scaleX";
    /// Vertical scale.
    pub const SCALE_Y: &str = "scaleY";
    /// Visibility flag.
    pub const VISIBLE: &str = "visible";
}

/// A visual object owned by the host application.
pub trait VisualObject {
    /// Read a field as JSON. `None` when the object has no such field.
    fn read(&self, field: &str) -> Option<Value>;

    /// Write a field. Values of the wrong type are ignored.
    fn write(&mut self, field: &str, value: &Value);

    /// Discrete "standing on ground" signal for platformer-style motion.
    fn grounded(&self) -> Option<bool> {
        None
    }

    /// Release the object. Called when a remote binding is dropped.
    fn destroy(&mut self) {}

    /// Current position, if both axes are numeric.
    fn position(&self) -> Option<(f64, f64)> {
        let x = self.read(fields::X)?.as_f64()?;
        let y = self.read(fields::Y)?.as_f64()?;
        Some((x, y))
    }

    /// Move the object.
    fn set_position(&mut self, x: f64, y: f64) {
        self.write(fields::X, &Value::from(x));
        self.write(fields::Y, &Value::from(y));
    }

    /// Set the rotation.
    fn set_rotation(&mut self, rotation: f64) {
        self.write(fields::ROTATION, &Value::from(rotation));
    }
}

/// Visual object shared between game code and the sync engine.
pub type SharedObject = Rc<RefCell<dyn VisualObject>>;

/// Wrap a concrete object for sharing with the engine.
pub fn shared<T: VisualObject + 'static>(object: T) -> Rc<RefCell<T>> {
    Rc::new(RefCell::new(object))
}

/// Plain sprite used by headless runs and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Rotation in radians.
    pub rotation: f64,
    /// Opacity.
    pub alpha: f64,
    /// Horizontal scale.
    pub scale_x: f64,
    /// Vertical scale.
    pub scale_y: f64,
    /// Visibility flag.
    pub visible: bool,
    /// Platformer grounded signal, when the sprite has a physics body.
    pub on_ground: Option<bool>,
    /// Fields outside the well-known set (static metadata).
    pub extra: Map<String, Value>,
    /// Set once [`VisualObject::destroy`] ran.
    pub destroyed: bool,
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            alpha: 1.0,
            scale_x: 1.0,
            scale_y: 1.0,
            visible: true,
            on_ground: None,
            extra: Map::new(),
            destroyed: false,
        }
    }
}

impl Sprite {
    /// Sprite at the given position.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }
}

impl VisualObject for Sprite {
    fn read(&self, field: &str) -> Option<Value> {
        match field {
            fields::X => Some(Value::from(self.x)),
            fields::Y => Some(Value::from(self.y)),
            fields::ROTATION => Some(Value::from(self.rotation)),
            fields::ALPHA => Some(Value::from(self.alpha)),
            fields::SCALE_X => Some(Value::from(self.scale_x)),
            fields::SCALE_Y => Some(Value::from(self.scale_y)),
            fields::VISIBLE => Some(Value::from(self.visible)),
            other => self.extra.get(other).cloned(),
        }
    }

    fn write(&mut self, field: &str, value: &Value) {
        let slot = match field {
            fields::X => &mut self.x,
            fields::Y => &mut self.y,
            fields::ROTATION => &mut self.rotation,
            fields::ALPHA => &mut self.alpha,
            fields::SCALE_X => &mut self.scale_x,
            fields::SCALE_Y => &mut self.scale_y,
            fields::VISIBLE => {
                if let Some(visible) = value.as_bool() {
                    self.visible = visible;
                }
                return;
            }
            other => {
                self.extra.insert(other.to_string(), value.clone());
                return;
            }
        };
        if let Some(number) = value.as_f64() {
            *slot = number;
        }
    }

    fn grounded(&self) -> Option<bool> {
        self.on_ground
    }

    fn destroy(&mut self) {
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sprite_roundtrips_known_fields() {
        let mut sprite = Sprite::default();
        sprite.write(fields::X, &json!(12.5));
        sprite.write(fields::VISIBLE, &json!(false));
        sprite.write(fields::ALPHA, &json!(0.25));

        assert_eq!(sprite.x, 12.5);
        assert!(!sprite.visible);
        assert_eq!(sprite.read(fields::ALPHA), Some(json!(0.25)));
    }

    #[test]
    fn test_sprite_ignores_wrong_types() {
        let mut sprite = Sprite::at(3.0, 4.0);
        sprite.write(fields::X, &json!("left"));
        sprite.write(fields::VISIBLE, &json!(1));

        assert_eq!(sprite.x, 3.0);
        assert!(sprite.visible);
    }

    #[test]
    fn test_sprite_stores_extra_fields() {
        let mut sprite = Sprite::default();
        sprite.write("role", &json!("fire"));

        assert_eq!(sprite.read("role"), Some(json!("fire")));
        assert_eq!(sprite.read("missing"), None);
    }

    #[test]
    fn test_position_helpers() {
        let mut sprite = Sprite::default();
        sprite.set_position(50.0, 75.0);
        sprite.set_rotation(1.5);

        assert_eq!(sprite.position(), Some((50.0, 75.0)));
        assert_eq!(sprite.rotation, 1.5);
    }

    #[test]
    fn test_shared_object_coerces_to_trait_object() {
        let sprite = shared(Sprite::at(1.0, 2.0));
        let object: SharedObject = sprite.clone();
        object.borrow_mut().destroy();

        assert!(sprite.borrow().destroyed);
    }
}
