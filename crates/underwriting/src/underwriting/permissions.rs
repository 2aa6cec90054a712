use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Underwriter,
    Manager,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CreateAssessment,
    ViewAssessment,
    ApproveAssessment,
    DenyAssessment,
    ManageUsers,
    ManageDocuments,
    ViewReports,
    ManageSettings,
    ManageThresholds,
    ExportData,
    ViewAuditLogs,
}

/// Capability check supplied by the authentication layer.
pub trait PermissionCheck: Send + Sync {
    fn has_permission(&self, role: UserRole, permission: Permission) -> bool;
}

/// Static role grants used when no external policy store is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePermissions;

impl RolePermissions {
    pub fn grants(role: UserRole) -> &'static [Permission] {
        use Permission::*;
        match role {
            UserRole::Admin => &[
                CreateAssessment,
                ViewAssessment,
                ApproveAssessment,
                DenyAssessment,
                ManageUsers,
                ManageDocuments,
                ViewReports,
                ManageSettings,
                ManageThresholds,
                ExportData,
                ViewAuditLogs,
            ],
            UserRole::Manager => &[
                CreateAssessment,
                ViewAssessment,
                ApproveAssessment,
                DenyAssessment,
                ViewReports,
                ManageThresholds,
                ExportData,
                ViewAuditLogs,
            ],
            UserRole::Underwriter => &[
                CreateAssessment,
                ViewAssessment,
                ApproveAssessment,
                DenyAssessment,
                ViewReports,
                ExportData,
            ],
            UserRole::Viewer => &[ViewAssessment, ViewReports],
        }
    }
}

impl PermissionCheck for RolePermissions {
    fn has_permission(&self, role: UserRole, permission: Permission) -> bool {
        Self::grants(role).contains(&permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewers_cannot_approve() {
        let permissions = RolePermissions;
        assert!(!permissions.has_permission(UserRole::Viewer, Permission::ApproveAssessment));
        assert!(permissions.has_permission(UserRole::Underwriter, Permission::ApproveAssessment));
        assert!(permissions.has_permission(UserRole::Manager, Permission::ManageThresholds));
        assert!(!permissions.has_permission(UserRole::Underwriter, Permission::ManageThresholds));
    }
}
