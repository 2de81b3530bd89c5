//! # Request Types
//!
//! MailerSend API request bodies.

use serde::Serialize;

/// Address object used for both sender and recipients
#[derive(Debug, Serialize)]
pub struct Address<'a> {
    pub email: &'a str,
}

/// Body of `POST /v1/email`
///
/// Serializes to `{"from":{"email":..},"to":[{"email":..}],"subject":..,"text":..}`.
#[derive(Debug, Serialize)]
pub struct SendEmailRequest<'a> {
    pub from: Address<'a>,
    pub to: Vec<Address<'a>>,
    pub subject: &'a str,
    pub text: &'a str,
}

impl<'a> SendEmailRequest<'a> {
    pub fn new(from: &'a str, to: &'a str, subject: &'a str, text: &'a str) -> Self {
        Self {
            from: Address { email: from },
            to: vec![Address { email: to }],
            subject,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_send_request_shape() {
        let request = SendEmailRequest::new("x@mlsender.net", "a@b.com", "Hi", "Hello \"there\"");

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "from": {"email": "x@mlsender.net"},
                "to": [{"email": "a@b.com"}],
                "subject": "Hi",
                "text": "Hello \"there\""
            })
        );
    }
}
