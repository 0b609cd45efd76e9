//! SAML Status types.
//!
//! Status information returned in SAML protocol responses.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{status_codes, SAMLP_NS};
use crate::error::{SamlError, SamlResult};
use crate::xml::Element;

/// SAML protocol status.
///
/// Contains the status code and optional message for a SAML response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// The status code.
    pub status_code: StatusCode,

    /// Optional status message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,

    /// Optional detailed status information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,
}

impl Status {
    /// Creates a status with the given code and no message.
    #[must_use]
    pub const fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            status_message: None,
            status_detail: None,
        }
    }

    /// Creates a success status.
    #[must_use]
    pub fn success() -> Self {
        Self::new(StatusCode::success())
    }

    /// Returns true if this status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }

    /// Sets the status message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }

    /// Reads a `samlp:Status` element.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MalformedDocument`] if the status code is missing.
    pub fn from_element(element: &Element) -> SamlResult<Self> {
        let code = element
            .child(SAMLP_NS, "StatusCode")
            .ok_or_else(|| SamlError::missing("StatusCode"))?;
        let status_message = element
            .child(SAMLP_NS, "StatusMessage")
            .map(|m| m.text().trim().to_string());
        // StatusDetail content is arbitrary XML; keep its text only.
        let status_detail = element
            .child(SAMLP_NS, "StatusDetail")
            .map(|d| d.text().trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            status_code: StatusCode::from_element(code)?,
            status_message,
            status_detail,
        })
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::success()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_code.value)?;
        if let Some(sub) = self.status_code.sub_status_value() {
            write!(f, " / {sub}")?;
        }
        if let Some(message) = &self.status_message {
            write!(f, " ({message})")?;
        }
        Ok(())
    }
}

/// SAML status code.
///
/// Status codes can be nested, with a top-level code and optional sub-code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode {
    /// The status code URI value.
    pub value: String,

    /// Optional nested status code providing more detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Box<StatusCode>>,
}

impl StatusCode {
    /// Creates a new status code with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            status_code: None,
        }
    }

    /// Creates a success status code.
    #[must_use]
    pub fn success() -> Self {
        Self::new(status_codes::SUCCESS)
    }

    /// Creates a requester error status code.
    #[must_use]
    pub fn requester() -> Self {
        Self::new(status_codes::REQUESTER)
    }

    /// Creates a responder error status code.
    #[must_use]
    pub fn responder() -> Self {
        Self::new(status_codes::RESPONDER)
    }

    /// Adds a sub-status code.
    #[must_use]
    pub fn with_sub_status(mut self, sub: StatusCode) -> Self {
        self.status_code = Some(Box::new(sub));
        self
    }

    /// Returns true if this is a success status code.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.value == status_codes::SUCCESS
    }

    /// Returns the sub-status code value if present.
    #[must_use]
    pub fn sub_status_value(&self) -> Option<&str> {
        self.status_code.as_ref().map(|s| s.value.as_str())
    }

    fn from_element(element: &Element) -> SamlResult<Self> {
        let value = element
            .attribute("Value")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SamlError::missing("StatusCode Value"))?;
        let status_code = match element.child(SAMLP_NS, "StatusCode") {
            Some(nested) => Some(Box::new(Self::from_element(nested)?)),
            None => None,
        };
        Ok(Self {
            value: value.to_string(),
            status_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sub_status_codes;
    use crate::xml::Document;

    #[test]
    fn status_success() {
        let status = Status::success();
        assert!(status.is_success());
        assert!(status.status_message.is_none());
    }

    #[test]
    fn status_code_with_sub() {
        let code = StatusCode::requester()
            .with_sub_status(StatusCode::new(sub_status_codes::AUTHN_FAILED));
        assert!(!code.is_success());
        assert_eq!(code.sub_status_value(), Some(sub_status_codes::AUTHN_FAILED));
    }

    #[test]
    fn status_display_lists_codes_and_message() {
        let status = Status::new(
            StatusCode::responder().with_sub_status(StatusCode::new(sub_status_codes::AUTHN_FAILED)),
        )
        .with_message("ErrorCode nr19");
        assert_eq!(
            status.to_string(),
            "urn:oasis:names:tc:SAML:2.0:status:Responder / \
             urn:oasis:names:tc:SAML:2.0:status:AuthnFailed (ErrorCode nr19)"
        );
    }

    #[test]
    fn status_from_element_reads_nested_code() {
        let doc = Document::parse(
            r#"<samlp:Status xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol">
                <samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Requester">
                    <samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:RequestDenied"/>
                </samlp:StatusCode>
                <samlp:StatusMessage> ErrorCode nr22 </samlp:StatusMessage>
            </samlp:Status>"#,
        )
        .unwrap();

        let status = Status::from_element(doc.root()).unwrap();
        assert!(!status.is_success());
        assert_eq!(status.status_code.value, status_codes::REQUESTER);
        assert_eq!(
            status.status_code.sub_status_value(),
            Some(sub_status_codes::REQUEST_DENIED)
        );
        assert_eq!(status.status_message.as_deref(), Some("ErrorCode nr22"));
        assert!(status.status_detail.is_none());
    }

    #[test]
    fn status_without_code_is_malformed() {
        let doc = Document::parse(
            r#"<samlp:Status xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol"/>"#,
        )
        .unwrap();
        assert!(matches!(
            Status::from_element(doc.root()),
            Err(SamlError::MalformedDocument(_))
        ));
    }
}
