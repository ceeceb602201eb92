//! The `login/Basic` endpoint.

use serde_json::Value;

use crate::error::Result;
use crate::schema::{Presence, Shape, ValidationMode};
use crate::types::Role;

pub static LOGIN_SHAPE: Shape = Shape {
    name: "login",
    required: &["firstname", "lastname", "token", "roles", "loginTime"],
    optional: &["email", "provider"],
};

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub firstname: String,
    pub lastname: String,
    pub token: String,
    pub roles: Vec<Role>,
    pub login_time: String,
    pub email: Presence<String>,
    pub provider: Presence<String>,
    raw: Value,
}

impl LoginResponse {
    pub fn from_value(raw: &Value, mode: ValidationMode) -> Result<Self> {
        let mapped = LOGIN_SHAPE.map(raw, mode)?;

        let roles = mapped
            .req_array("roles")?
            .iter()
            .map(|role| {
                let role_str = role
                    .as_str()
                    .ok_or_else(|| mapped.derivation_error("roles", "expected a string entry"))?;
                Role::try_from(role_str)
                    .map_err(|e| mapped.derivation_error("roles", e.to_string()))
            })
            .collect::<Result<Vec<Role>>>()?;

        Ok(LoginResponse {
            firstname: mapped.req_string("firstname")?,
            lastname: mapped.req_string("lastname")?,
            token: mapped.req_string("token")?,
            roles,
            login_time: mapped.req_string("loginTime")?,
            email: mapped.opt_string("email")?,
            provider: mapped.opt_string("provider")?,
            raw: mapped.to_value(),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::error::Error;

    fn login_json() -> Value {
        json!({
            "email": "owner@example.com",
            "firstname": "Tesla",
            "lastname": "Energy",
            "roles": ["Home_Owner"],
            "token": "22y7Ghvk3bFMNP1EBvRoGXGKbn5H2dLnogIFhMJPq31RMJQBlXWgtg==",
            "provider": "Basic",
            "loginTime": "2023-03-06T12:00:23.433+01:00",
        })
    }

    #[test]
    fn parses_login_response() {
        let login = LoginResponse::from_value(&login_json(), ValidationMode::Strict).unwrap();
        assert_eq!(login.firstname, "Tesla");
        assert_eq!(login.roles, vec![Role::HomeOwner]);
        assert_eq!(login.email, Presence::Value("owner@example.com".to_string()));
        assert!(!login.token.is_empty());
    }

    #[test]
    fn unknown_role_is_a_derivation_error() {
        let mut raw = login_json();
        raw["roles"] = json!(["Home_Owner", "Galactic_Overlord"]);
        match LoginResponse::from_value(&raw, ValidationMode::Strict).unwrap_err() {
            Error::Derivation { field, reason, .. } => {
                assert_eq!(field, "roles");
                assert!(reason.contains("Galactic_Overlord"));
            }
            other => panic!("expected Derivation, got {other:?}"),
        }
    }
}
