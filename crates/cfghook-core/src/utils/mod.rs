//! Small helpers shared across the backend.
use std::any::Any;

/// Extract the message of a caught panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Unknown panic reason".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::panic_message;

    #[test]
    fn test_panic_message_variants() {
        let payload = std::panic::catch_unwind(|| -> u8 { panic!("static message") }).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload = std::panic::catch_unwind(|| -> u8 { panic!("formatted {}", 42) }).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 42");

        let payload = std::panic::catch_unwind(|| -> u8 { std::panic::panic_any(7u8) }).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic reason");
    }
}
