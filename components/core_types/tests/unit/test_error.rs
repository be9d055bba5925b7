//! Unit tests for JsError and ErrorKind

use core_types::{ErrorKind, FrameKind, JsError, StackFrame};

#[cfg(test)]
mod error_kind_tests {
    use super::*;

    #[test]
    fn test_error_kind_display_names() {
        assert_eq!(ErrorKind::Error.to_string(), "Error");
        assert_eq!(ErrorKind::TypeError.to_string(), "TypeError");
        assert_eq!(ErrorKind::RangeError.to_string(), "RangeError");
    }

    #[test]
    fn test_error_kind_equality() {
        assert_eq!(ErrorKind::TypeError, ErrorKind::TypeError);
        assert_ne!(ErrorKind::TypeError, ErrorKind::RangeError);
    }
}

#[cfg(test)]
mod js_error_tests {
    use super::*;

    #[test]
    fn test_js_error_creation_minimal() {
        let error = JsError::new(ErrorKind::TypeError, "undefined is not a function");

        assert!(matches!(error.kind, ErrorKind::TypeError));
        assert_eq!(error.message, "undefined is not a function");
        assert!(error.stack.is_empty());
    }

    #[test]
    fn test_js_error_with_stack_frames() {
        let mut error = JsError::new(ErrorKind::Error, "x is not defined");
        error.stack = vec![
            StackFrame::new(Some("innerFunction".to_string()), FrameKind::Call),
            StackFrame::new(Some("outerFunction".to_string()), FrameKind::Script),
        ];

        assert_eq!(error.stack.len(), 2);
        assert_eq!(error.stack[0].function_name, Some("innerFunction".to_string()));
        assert_eq!(error.stack[1].kind, FrameKind::Script);
    }

    #[test]
    fn test_js_error_is_std_error() {
        fn takes_error(_: &dyn std::error::Error) {}
        let error = JsError::error("There was an error in the operation.");
        takes_error(&error);
        assert_eq!(error.to_string(), "Error: There was an error in the operation.");
    }

    #[test]
    fn test_js_error_clone() {
        let mut error1 = JsError::range_error("Maximum call stack size exceeded");
        error1.stack.push(StackFrame::new(None, FrameKind::Call));
        let error2 = error1.clone();

        assert_eq!(error1, error2);
        assert_eq!(error1.stack.len(), error2.stack.len());
    }
}
