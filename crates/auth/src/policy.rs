//! The ABAC policy engine.

use std::collections::HashMap;

use tracing::warn;

use crate::{AccessDecision, PermissionRequest, PolicyError, Role, Scope};

/// Default-deny policy engine.
///
/// Access is granted only when all of these hold:
/// 1. the role's configured scope list contains a scope matching
///    `resource:action`,
/// 2. that scope's id is present in the caller's granted scopes, and
/// 3. the scope's filter and constraint are satisfied by the request
///    context.
///
/// `admin` bypasses scope matching entirely.
///
/// The role-scope map is immutable configuration: build the engine once at
/// process start and share it by reference. Evaluation never mutates, so
/// no locking is needed.
///
/// Note on the `own` filter: the engine checks only that `owner_id` is
/// *present* on the request. Comparing it against the authenticated user's
/// id is the caller layer's job, since only that layer knows the caller.
#[derive(Debug)]
pub struct PolicyEngine {
    role_scopes: HashMap<Role, Vec<Scope>>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self {
            role_scopes: static_role_scopes(),
        }
    }

    /// Evaluate one permission request.
    ///
    /// A deny is a normal `AccessDecision`; only an unknown role is an
    /// error.
    pub fn evaluate(
        &self,
        role: &str,
        granted_scopes: &[String],
        request: &PermissionRequest,
    ) -> Result<AccessDecision, PolicyError> {
        let role: Role = role.parse()?;

        if role == Role::Admin {
            return Ok(AccessDecision::allow(
                "Admin role has all permissions",
                "admin:all",
            ));
        }

        let role_scopes = self.role_scopes.get(&role).map(Vec::as_slice).unwrap_or(&[]);
        if role_scopes.is_empty() {
            return Ok(AccessDecision::deny(format!(
                "Role '{role}' has no defined scopes"
            )));
        }

        let matching: Vec<&Scope> = role_scopes
            .iter()
            .filter(|s| {
                s.matches(&request.resource, &request.action)
                    && granted_scopes.iter().any(|g| g == &s.id)
            })
            .collect();

        if matching.is_empty() {
            warn!(
                role = %role,
                resource = %request.resource,
                action = %request.action,
                "access denied: no matching scope"
            );
            return Ok(AccessDecision::deny(format!(
                "No scope grants {}:{} for role '{role}'",
                request.resource, request.action
            )));
        }

        for scope in matching {
            if self.satisfies(scope, request) {
                return Ok(AccessDecision::allow(
                    format!("Access granted via scope '{}'", scope.id),
                    scope.id.clone(),
                ));
            }
        }

        Ok(AccessDecision::deny(format!(
            "Scope filters or constraints not satisfied for {}:{}",
            request.resource, request.action
        )))
    }

    /// All scope ids configured for a role (introspection).
    pub fn scopes_for_role(&self, role: Role) -> Vec<String> {
        self.role_scopes
            .get(&role)
            .map(|scopes| scopes.iter().map(|s| s.id.clone()).collect())
            .unwrap_or_default()
    }

    fn satisfies(&self, scope: &Scope, request: &PermissionRequest) -> bool {
        // Ownership filter: presence check only; the identity comparison
        // happens at the caller layer.
        if scope.filter.as_deref() == Some("own") && request.owner_id.is_none() {
            warn!(scope = %scope.id, "ownership check failed: no owner_id in request context");
            return false;
        }

        // The "all" filter always passes.

        if scope.constraint.as_deref() == Some("unconfirmed")
            && request.resource_status.as_deref() != Some("unconfirmed")
        {
            warn!(
                scope = %scope.id,
                resource_status = request.resource_status.as_deref().unwrap_or("<none>"),
                "constraint check failed"
            );
            return false;
        }

        true
    }
}

/// The fixed role-to-scope configuration.
///
/// Not runtime-editable. Admin's list exists for introspection only; admin
/// never goes through scope matching.
fn static_role_scopes() -> HashMap<Role, Vec<Scope>> {
    HashMap::from([
        (
            Role::Operator,
            vec![
                Scope::new("data", "create"),
                Scope::new("data", "read").with_filter("own"),
                Scope::new("data", "update").with_filter("own").with_constraint("unconfirmed"),
            ],
        ),
        (
            Role::Supervisor,
            vec![
                Scope::new("data", "read").with_filter("all"),
                Scope::new("data", "confirm"),
                Scope::new("data", "correct"),
                Scope::new("data", "reject"),
                Scope::new("reports", "read"),
            ],
        ),
        (
            Role::Auditor,
            vec![
                Scope::new("data", "read").with_filter("all"),
                Scope::new("audit", "read"),
                Scope::new("reports", "read"),
                Scope::new("events", "read"),
                Scope::new("users", "read"),
            ],
        ),
        (
            Role::Admin,
            vec![
                Scope::new("users", "manage"),
                Scope::new("roles", "manage"),
                Scope::new("system", "configure"),
                Scope::new("health", "read"),
                Scope::new("metrics", "read"),
                Scope::new("data", "read").with_filter("all"),
                Scope::new("audit", "read"),
                Scope::new("events", "read"),
            ],
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine() -> PolicyEngine {
        PolicyEngine::new()
    }

    fn granted(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn admin_bypasses_all_checks() {
        let decision = engine()
            .evaluate("admin", &[], &PermissionRequest::new("anything", "whatever"))
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.matched_scope.as_deref(), Some("admin:all"));
    }

    #[test]
    fn operator_can_create_data() {
        let decision = engine()
            .evaluate(
                "operator",
                &granted(&["data:create"]),
                &PermissionRequest::new("data", "create"),
            )
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.matched_scope.as_deref(), Some("data:create"));
    }

    #[test]
    fn operator_cannot_delete_data() {
        let decision = engine()
            .evaluate(
                "operator",
                &granted(&["data:create"]),
                &PermissionRequest::new("data", "delete"),
            )
            .unwrap();
        assert!(!decision.allowed);
        assert!(decision.reason.contains("data:delete"));
    }

    #[test]
    fn operator_can_read_own_data_when_owner_present() {
        let decision = engine()
            .evaluate(
                "operator",
                &granted(&["data:read:own"]),
                &PermissionRequest::new("data", "read").with_owner("u1"),
            )
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.matched_scope.as_deref(), Some("data:read:own"));
    }

    #[test]
    fn own_filter_requires_owner_id_presence() {
        // No owner context at all: the own filter cannot be satisfied.
        let decision = engine()
            .evaluate(
                "operator",
                &granted(&["data:read:own"]),
                &PermissionRequest::new("data", "read"),
            )
            .unwrap();
        assert!(!decision.allowed);
        assert!(decision.reason.contains("not satisfied"));
    }

    #[test]
    fn operator_cannot_read_all_data() {
        // data:read:all is not in the operator's configured scope list.
        let decision = engine()
            .evaluate(
                "operator",
                &granted(&["data:read:all"]),
                &PermissionRequest::new("data", "read"),
            )
            .unwrap();
        assert!(!decision.allowed);
    }

    #[test]
    fn supervisor_workflow_scopes() {
        let e = engine();
        for (scope, action) in [
            ("data:read:all", "read"),
            ("data:confirm", "confirm"),
            ("data:correct", "correct"),
            ("data:reject", "reject"),
        ] {
            let decision = e
                .evaluate(
                    "supervisor",
                    &granted(&[scope]),
                    &PermissionRequest::new("data", action),
                )
                .unwrap();
            assert!(decision.allowed, "supervisor should be granted {scope}");
            assert_eq!(decision.matched_scope.as_deref(), Some(scope));
        }
    }

    #[test]
    fn auditor_is_read_only() {
        let e = engine();

        for (resource, action, scope) in [
            ("data", "read", "data:read:all"),
            ("audit", "read", "audit:read"),
            ("events", "read", "events:read"),
            ("reports", "read", "reports:read"),
            ("users", "read", "users:read"),
        ] {
            let decision = e
                .evaluate(
                    "auditor",
                    &granted(&[scope]),
                    &PermissionRequest::new(resource, action),
                )
                .unwrap();
            assert!(decision.allowed, "auditor should read {resource}");
        }

        let write = e
            .evaluate(
                "auditor",
                &granted(&["data:read:all"]),
                &PermissionRequest::new("data", "confirm"),
            )
            .unwrap();
        assert!(!write.allowed);
    }

    #[test]
    fn unconfirmed_constraint_passes_on_unconfirmed_status() {
        let decision = engine()
            .evaluate(
                "operator",
                &granted(&["data:update:own"]),
                &PermissionRequest::new("data", "update")
                    .with_owner("u1")
                    .with_status("unconfirmed"),
            )
            .unwrap();
        assert!(decision.allowed);
    }

    #[test]
    fn unconfirmed_constraint_fails_on_confirmed_status() {
        let decision = engine()
            .evaluate(
                "operator",
                &granted(&["data:update:own"]),
                &PermissionRequest::new("data", "update")
                    .with_owner("u1")
                    .with_status("confirmed"),
            )
            .unwrap();
        assert!(!decision.allowed);
    }

    #[test]
    fn unconfirmed_constraint_fails_on_absent_status() {
        let decision = engine()
            .evaluate(
                "operator",
                &granted(&["data:update:own"]),
                &PermissionRequest::new("data", "update").with_owner("u1"),
            )
            .unwrap();
        assert!(!decision.allowed);
    }

    #[test]
    fn ungranted_scope_is_denied_even_if_configured() {
        // The role's table has data:create, but the token doesn't grant it.
        let decision = engine()
            .evaluate("operator", &[], &PermissionRequest::new("data", "create"))
            .unwrap();
        assert!(!decision.allowed);
    }

    #[test]
    fn unknown_role_is_an_error() {
        let err = engine()
            .evaluate("intruder", &[], &PermissionRequest::new("data", "read"))
            .unwrap_err();
        assert_eq!(err, PolicyError::UnknownRole("intruder".to_string()));
    }

    #[test]
    fn scopes_for_role_lists_configuration() {
        let e = engine();
        let operator = e.scopes_for_role(Role::Operator);
        assert_eq!(operator, vec!["data:create", "data:read:own", "data:update:own"]);

        let admin = e.scopes_for_role(Role::Admin);
        assert!(admin.contains(&"system:configure".to_string()));
        assert_eq!(admin.len(), 8);
    }

    proptest! {
        // Default-deny: with nothing granted, every non-admin evaluation
        // denies, whatever the request looks like.
        #[test]
        fn empty_scopes_always_deny(
            role_idx in 0usize..3,
            resource in "[a-z]{1,8}",
            action in "[a-z]{1,8}",
            owner in proptest::option::of("[a-z0-9]{1,6}"),
        ) {
            let role = [Role::Operator, Role::Supervisor, Role::Auditor][role_idx];
            let mut request = PermissionRequest::new(resource, action);
            if let Some(owner) = owner {
                request = request.with_owner(owner);
            }

            let decision = engine().evaluate(role.as_str(), &[], &request).unwrap();
            prop_assert!(!decision.allowed);
        }
    }
}
