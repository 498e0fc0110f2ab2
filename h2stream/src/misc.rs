use std::any::Any;

/// Extract a displayable message from a panic payload.
pub fn any_to_string(any: Box<dyn Any + Send + 'static>) -> String {
    if any.is::<String>() {
        *any.downcast::<String>().unwrap()
    } else if any.is::<&str>() {
        (*any.downcast::<&str>().unwrap()).to_owned()
    } else {
        "unknown any".to_owned()
    }
}
