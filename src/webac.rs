//! §4.4 WebAC filter: map an HTTP method (plus `ext=acl` override) to the
//! permission it requires, then consult [`crate::services::AccessControlService`].

use axum::http::Method;

use crate::error::LdpError;
use crate::model::{Extension, Session};
use crate::services::AccessControlService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Read,
    Write,
    Append,
    Control,
}

/// The context a handler (or `require_permission!`) authorizes against.
pub struct AuthContext<'a> {
    pub session: &'a Session,
    pub identifier: &'a str,
    pub challenges: &'a [String],
    pub access_control: &'a dyn AccessControlService,
}

impl<'a> AuthContext<'a> {
    /// Evaluate `permission` for this context's session and identifier;
    /// §4.4's failure rule: anonymous -> 401 with the configured
    /// challenges, authenticated-but-denied -> 403.
    pub async fn authorize(&self, permission: Permission) -> Result<(), LdpError> {
        let allowed = match permission {
            Permission::Read => self.access_control.can_read(self.session, self.identifier).await,
            Permission::Write => self.access_control.can_write(self.session, self.identifier).await,
            Permission::Append => self.access_control.can_append(self.session, self.identifier).await,
            Permission::Control => self.access_control.can_control(self.session, self.identifier).await,
        };
        if allowed {
            return Ok(());
        }
        if self.session.is_anonymous() {
            Err(LdpError::Unauthorized { challenges: self.challenges.to_vec() })
        } else {
            Err(LdpError::Forbidden)
        }
    }

    /// §4.4: `POST` is satisfied by either `Append` or `Write`.
    pub async fn authorize_post(&self) -> Result<(), LdpError> {
        if self.access_control.can_append(self.session, self.identifier).await
            || self.access_control.can_write(self.session, self.identifier).await
        {
            return Ok(());
        }
        if self.session.is_anonymous() {
            Err(LdpError::Unauthorized { challenges: self.challenges.to_vec() })
        } else {
            Err(LdpError::Forbidden)
        }
    }
}

/// Map a method (and `ext=acl` override) to the permission it requires.
/// `ext=acl` always requires `Control`, regardless of method, except where
/// the method itself is unsupported (→ 405).
pub fn required_permission(method: &Method, extension: Option<Extension>) -> Result<Permission, LdpError> {
    if extension == Some(Extension::Acl) {
        return Ok(Permission::Control);
    }
    match *method {
        Method::GET | Method::HEAD | Method::OPTIONS => Ok(Permission::Read),
        Method::PUT | Method::PATCH | Method::DELETE => Ok(Permission::Write),
        Method::POST => Ok(Permission::Append),
        _ => Err(LdpError::MethodNotAllowed {
            allow: vec!["GET", "HEAD", "OPTIONS", "POST", "PUT", "PATCH", "DELETE"],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acl_extension_always_requires_control() {
        assert_eq!(required_permission(&Method::GET, Some(Extension::Acl)).unwrap(), Permission::Control);
        assert_eq!(required_permission(&Method::PUT, Some(Extension::Acl)).unwrap(), Permission::Control);
    }

    #[test]
    fn read_methods_require_read() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            assert_eq!(required_permission(&method, None).unwrap(), Permission::Read);
        }
    }

    #[test]
    fn write_methods_require_write() {
        for method in [Method::PUT, Method::PATCH, Method::DELETE] {
            assert_eq!(required_permission(&method, None).unwrap(), Permission::Write);
        }
    }

    #[test]
    fn post_requires_append() {
        assert_eq!(required_permission(&Method::POST, None).unwrap(), Permission::Append);
    }

    #[test]
    fn unsupported_method_is_405() {
        assert!(matches!(
            required_permission(&Method::TRACE, None),
            Err(LdpError::MethodNotAllowed { .. })
        ));
    }
}
