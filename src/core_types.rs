//! Core types used throughout the system
//!
//! Fundamental identifiers and the actor model shared by the custody
//! and approval workflows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// User ID - globally unique, immutable after assignment.
///
/// Primary key for staff accounts; assigned by the (external) identity
/// service.
pub type UserId = u64;

/// Document ID - identifies a document held in custody.
pub type DocumentId = u64;

/// Staff role within a tenant.
///
/// `DevAdmin` is the platform operator role and crosses tenant
/// boundaries; `CompanyAdmin` administers a single tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "EMPLOYEE")]
    Employee,
    #[serde(rename = "COMPANY_ADMIN")]
    CompanyAdmin,
    #[serde(rename = "DEV_ADMIN")]
    DevAdmin,
}

impl Role {
    /// Admin capability covers both tenant admins and platform operators.
    #[inline]
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::CompanyAdmin | Role::DevAdmin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "EMPLOYEE",
            Role::CompanyAdmin => "COMPANY_ADMIN",
            Role::DevAdmin => "DEV_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lightweight user reference carried on workflow records.
///
/// The name is denormalized for display; the id is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
}

impl UserRef {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// The authenticated identity performing an action.
///
/// Supplied by the excluded auth component; everything downstream is a
/// pure function of this value plus the target record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub company_id: String,
}

impl Actor {
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        role: Role,
        company_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            company_id: company_id.into(),
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Platform operators see across tenants; everyone else is scoped
    /// to their own company.
    #[inline]
    pub fn can_see_company(&self, company_id: &str) -> bool {
        self.role == Role::DevAdmin || self.company_id == company_id
    }

    pub fn user_ref(&self) -> UserRef {
        UserRef::new(self.id, self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_roles() {
        assert!(!Role::Employee.is_admin());
        assert!(Role::CompanyAdmin.is_admin());
        assert!(Role::DevAdmin.is_admin());
    }

    #[test]
    fn test_company_scope() {
        let admin = Actor::new(1, "ada", Role::CompanyAdmin, "acme");
        assert!(admin.can_see_company("acme"));
        assert!(!admin.can_see_company("globex"));

        let dev = Actor::new(2, "ops", Role::DevAdmin, "platform");
        assert!(dev.can_see_company("acme"));
        assert!(dev.can_see_company("globex"));
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Employee.to_string(), "EMPLOYEE");
        assert_eq!(Role::CompanyAdmin.to_string(), "COMPANY_ADMIN");
    }
}
