//! Access resolution rules.
//!
//! Evaluation order, first match wins:
//! 1. Administrators are permitted everything.
//! 2. Users without a department may not view or list documents and
//!    categories (`NoDepartment`, rendered as guidance).
//! 3. List queries are narrowed to the user's department by [`scope`].
//! 4. The per-resource rules in [`resource_rule`].

use crate::auth::models::{AuthenticatedUser, Grants, Role};
use crate::error::AppError;

use super::{Decision, DenyReason, Operation, Resource, ResourceKind, Scope};

/// Decide whether `user` may perform `op` on `resource`.
///
/// Total: every input yields a decision. Unknown combinations are denied.
pub fn can(
    user: Option<&AuthenticatedUser>,
    op: Operation,
    resource: Resource<'_>,
) -> Decision {
    let Some(user) = user else {
        return Decision::Deny(DenyReason::NotAuthenticated);
    };

    if user.is_admin() {
        return Decision::Permit;
    }

    if user.department.is_none() && is_department_view(op, resource.kind()) {
        return Decision::Deny(DenyReason::NoDepartment);
    }

    match resource_rule(user, op, resource) {
        Ok(()) => Decision::Permit,
        Err(reason) => Decision::Deny(reason),
    }
}

/// Like [`can`] for an authenticated user, as a `Result` for `?` call sites.
pub fn require(
    user: &AuthenticatedUser,
    op: Operation,
    resource: Resource<'_>,
) -> Result<(), AppError> {
    let decision = can(Some(user), op, resource);
    if let Decision::Deny(reason) = decision {
        tracing::debug!(
            user = %user.username,
            ?op,
            kind = ?resource.kind(),
            %reason,
            "access denied"
        );
    }
    decision.into_result()
}

/// The filter predicate for a list-level operation on `kind`.
///
/// Fails only when the operation itself is denied; an empty result set is
/// a valid outcome of scoping and not an error.
pub fn scope(
    user: Option<&AuthenticatedUser>,
    op: Operation,
    kind: ResourceKind,
) -> Result<Scope, DenyReason> {
    if let Decision::Deny(reason) = can(user, op, Resource::Kind(kind)) {
        return Err(reason);
    }
    let user = user.ok_or(DenyReason::NotAuthenticated)?;

    if user.is_admin() {
        return Ok(Scope::unrestricted());
    }

    let own_department = || {
        user.department
            .clone()
            .map(Scope::department)
            .ok_or(DenyReason::NoDepartment)
    };

    match (op, kind) {
        (_, ResourceKind::Department) => Ok(Scope::unrestricted()),
        (Operation::List, ResourceKind::Document) => Ok(own_department()?.published_only()),
        (Operation::Publish, ResourceKind::Document) if user.has_grant(Grants::MANAGE_DOCUMENTS) => {
            Ok(Scope::unrestricted())
        }
        _ => own_department(),
    }
}

fn is_department_view(op: Operation, kind: ResourceKind) -> bool {
    matches!(op, Operation::View | Operation::List)
        && matches!(kind, ResourceKind::Document | ResourceKind::Category)
}

/// Rules for non-administrators.
fn resource_rule(
    user: &AuthenticatedUser,
    op: Operation,
    resource: Resource<'_>,
) -> Result<(), DenyReason> {
    let manages_documents = user.has_grant(Grants::MANAGE_DOCUMENTS);

    match (op, resource) {
        // Lists: the scope narrows, the operation itself is allowed.
        (Operation::List, Resource::Kind(ResourceKind::Document | ResourceKind::Category))
        | (Operation::List | Operation::View, Resource::Kind(ResourceKind::Department))
        | (Operation::View, Resource::Department(_)) => Ok(()),

        (Operation::List, Resource::Kind(ResourceKind::User))
        | (Operation::ModerateComments, Resource::Kind(ResourceKind::Comment)) => {
            manager_with_department(user)
        }

        // Comments go on documents the user can see.
        (Operation::View | Operation::Comment, Resource::Document(document))
        | (Operation::View, Resource::Comment { document, .. }) => {
            if !document.is_published && !manages_documents {
                return Err(DenyReason::Unpublished);
            }
            same_department(user, &document.department_id)
        }

        (Operation::View, Resource::Category(category)) => {
            same_department(user, &category.department_id)
        }

        (Operation::Create, Resource::Kind(ResourceKind::Document) | Resource::Document(_)) => {
            if user.role == Role::Manager || manages_documents {
                Ok(())
            } else {
                Err(DenyReason::InsufficientRole)
            }
        }

        // Department membership alone is not enough to touch another author's work.
        (Operation::Edit | Operation::Delete, Resource::Document(document)) => {
            if document.author_id == user.user_id || manages_documents {
                Ok(())
            } else {
                Err(DenyReason::NotOwner)
            }
        }

        (Operation::Delete, Resource::Comment { comment, document }) => {
            if comment.author_id == user.user_id {
                return Ok(());
            }
            match user.role {
                Role::Manager if user.department.is_some() => {
                    same_department(user, &document.department_id)
                }
                _ => Err(DenyReason::NotOwner),
            }
        }

        (Operation::ModerateComments, Resource::Comment { document, .. }) => {
            manager_with_department(user)?;
            same_department(user, &document.department_id)
        }

        (Operation::Publish, Resource::Kind(ResourceKind::Document)) => {
            if manages_documents {
                Ok(())
            } else {
                manager_with_department(user)
            }
        }

        (Operation::Publish, Resource::Document(document)) => {
            if manages_documents {
                return Ok(());
            }
            manager_with_department(user)?;
            same_department(user, &document.department_id)
        }

        (Operation::Create, Resource::Kind(ResourceKind::Department) | Resource::Department(_))
        | (Operation::Edit | Operation::Delete, Resource::Department(_)) => {
            grant(user, Grants::MANAGE_DEPARTMENTS)
        }

        (Operation::Create, Resource::Kind(ResourceKind::Category)) => {
            if user.has_grant(Grants::MANAGE_CATEGORIES) || user.role == Role::Manager {
                Ok(())
            } else {
                Err(DenyReason::InsufficientRole)
            }
        }

        (Operation::Create | Operation::Edit | Operation::Delete, Resource::Category(category)) => {
            if user.has_grant(Grants::MANAGE_CATEGORIES) {
                return Ok(());
            }
            manager_with_department(user)?;
            same_department(user, &category.department_id)
        }

        // A user may pick their own department once; reassignment is an admin task.
        (Operation::AssignDepartment, Resource::User(target)) => {
            if target.id == user.user_id && user.department.is_none() {
                Ok(())
            } else {
                Err(DenyReason::InsufficientRole)
            }
        }

        _ => Err(DenyReason::InsufficientRole),
    }
}

fn same_department(user: &AuthenticatedUser, department_id: &str) -> Result<(), DenyReason> {
    if user.in_department(department_id) {
        Ok(())
    } else {
        Err(DenyReason::WrongDepartment)
    }
}

fn manager_with_department(user: &AuthenticatedUser) -> Result<(), DenyReason> {
    match (user.role, &user.department) {
        (Role::Manager, Some(_)) => Ok(()),
        (Role::Manager, None) => Err(DenyReason::NoDepartment),
        _ => Err(DenyReason::InsufficientRole),
    }
}

fn grant(user: &AuthenticatedUser, grant: Grants) -> Result<(), DenyReason> {
    if user.has_grant(grant) {
        Ok(())
    } else {
        Err(DenyReason::InsufficientRole)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{new_id, Category, Comment, Document, User};
    use chrono::Utc;

    const IT: &str = "dept-it";
    const HR: &str = "dept-hr";

    fn user(role: Role, department: Option<&str>) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: new_id(),
            username: format!("{role}-user"),
            role,
            department: department.map(str::to_string),
            grants: Grants::empty(),
        }
    }

    fn with_grants(mut user: AuthenticatedUser, grants: Grants) -> AuthenticatedUser {
        user.grants = grants;
        user
    }

    fn document(department: &str, author: &str, is_published: bool) -> Document {
        let now = Utc::now();
        Document {
            id: new_id(),
            title: "Doc".to_string(),
            slug: "doc".to_string(),
            content: "Content".to_string(),
            author_id: author.to_string(),
            category_id: "cat".to_string(),
            department_id: department.to_string(),
            file: None,
            is_published,
            created_at: now,
            updated_at: now,
            last_comment_at: None,
        }
    }

    fn comment(document: &Document, author: &str) -> Comment {
        Comment {
            id: new_id(),
            document_id: document.id.clone(),
            author_id: author.to_string(),
            text: "Looks good".to_string(),
            link: None,
            created_at: Utc::now(),
            is_active: true,
        }
    }

    fn denied(decision: Decision) -> DenyReason {
        match decision {
            Decision::Deny(reason) => reason,
            Decision::Permit => panic!("expected a denial"),
        }
    }

    #[test]
    fn test_anonymous_is_not_authenticated() {
        let doc = document(IT, "someone", true);
        assert_eq!(
            denied(can(None, Operation::View, Resource::Document(&doc))),
            DenyReason::NotAuthenticated
        );
        assert_eq!(
            scope(None, Operation::List, ResourceKind::Document),
            Err(DenyReason::NotAuthenticated)
        );
    }

    #[test]
    fn test_admin_views_everything() {
        let admin = user(Role::Admin, None);
        for doc in [
            document(IT, "x", true),
            document(HR, "x", false),
            document("elsewhere", "y", false),
        ] {
            assert!(can(Some(&admin), Operation::View, Resource::Document(&doc)).is_permitted());
            assert!(can(Some(&admin), Operation::Edit, Resource::Document(&doc)).is_permitted());
            assert!(can(Some(&admin), Operation::Delete, Resource::Document(&doc)).is_permitted());
        }
        assert_eq!(
            scope(Some(&admin), Operation::List, ResourceKind::Document),
            Ok(Scope::unrestricted())
        );
    }

    #[test]
    fn test_list_scope_is_department_and_published() {
        for role in [Role::Employee, Role::Manager] {
            let member = user(role, Some(IT));
            let scope = scope(Some(&member), Operation::List, ResourceKind::Document).unwrap();
            assert_eq!(scope, Scope::department(IT.to_string()).published_only());

            assert!(scope.admits_document(&document(IT, "x", true)));
            assert!(!scope.admits_document(&document(IT, "x", false)));
            assert!(!scope.admits_document(&document(HR, "x", true)));
        }
    }

    #[test]
    fn test_unassigned_users_need_department() {
        for role in [Role::Employee, Role::Manager] {
            let newcomer = user(role, None);
            assert_eq!(
                scope(Some(&newcomer), Operation::List, ResourceKind::Document),
                Err(DenyReason::NoDepartment)
            );
            assert_eq!(
                scope(Some(&newcomer), Operation::List, ResourceKind::Category),
                Err(DenyReason::NoDepartment)
            );
            let doc = document(IT, "x", true);
            assert_eq!(
                denied(can(Some(&newcomer), Operation::View, Resource::Document(&doc))),
                DenyReason::NoDepartment
            );
        }
    }

    #[test]
    fn test_view_requires_department_and_publication() {
        let employee = user(Role::Employee, Some(IT));
        let published = document(IT, "x", true);
        let draft = document(IT, "x", false);
        let foreign = document(HR, "x", true);

        assert!(can(Some(&employee), Operation::View, Resource::Document(&published)).is_permitted());
        assert_eq!(
            denied(can(Some(&employee), Operation::View, Resource::Document(&draft))),
            DenyReason::Unpublished
        );
        assert_eq!(
            denied(can(Some(&employee), Operation::View, Resource::Document(&foreign))),
            DenyReason::WrongDepartment
        );

        let editor = with_grants(user(Role::Employee, Some(IT)), Grants::MANAGE_DOCUMENTS);
        assert!(can(Some(&editor), Operation::View, Resource::Document(&draft)).is_permitted());

        // The grant does not lift the department check.
        let foreign_draft = document(HR, "x", false);
        assert_eq!(
            denied(can(Some(&editor), Operation::View, Resource::Document(&foreign_draft))),
            DenyReason::WrongDepartment
        );
    }

    #[test]
    fn test_create_document_roles() {
        let create = |u: &AuthenticatedUser| {
            can(Some(u), Operation::Create, Resource::Kind(ResourceKind::Document))
        };
        assert!(create(&user(Role::Admin, None)).is_permitted());
        assert!(create(&user(Role::Manager, Some(IT))).is_permitted());
        assert_eq!(
            denied(create(&user(Role::Employee, Some(IT)))),
            DenyReason::InsufficientRole
        );
        let editor = with_grants(user(Role::Employee, Some(IT)), Grants::MANAGE_DOCUMENTS);
        assert!(create(&editor).is_permitted());
        // Department resolution happens later; the role check alone passes.
        assert!(create(&user(Role::Manager, None)).is_permitted());
    }

    #[test]
    fn test_manager_cannot_edit_colleagues_document_without_grant() {
        let manager = user(Role::Manager, Some(IT));
        let doc = document(IT, "another-author", true);
        assert_eq!(
            denied(can(Some(&manager), Operation::Edit, Resource::Document(&doc))),
            DenyReason::NotOwner
        );
        assert_eq!(
            denied(can(Some(&manager), Operation::Delete, Resource::Document(&doc))),
            DenyReason::NotOwner
        );

        let granted = with_grants(manager, Grants::MANAGE_DOCUMENTS);
        assert!(can(Some(&granted), Operation::Edit, Resource::Document(&doc)).is_permitted());
    }

    #[test]
    fn test_author_edits_own_document() {
        let author = user(Role::Employee, Some(IT));
        let doc = document(IT, &author.user_id, true);
        assert!(can(Some(&author), Operation::Edit, Resource::Document(&doc)).is_permitted());
        assert!(can(Some(&author), Operation::Delete, Resource::Document(&doc)).is_permitted());
    }

    #[test]
    fn test_comment_requires_same_department() {
        let doc = document(IT, "x", true);
        assert!(can(Some(&user(Role::Employee, Some(IT))), Operation::Comment, Resource::Document(&doc))
            .is_permitted());
        assert_eq!(
            denied(can(Some(&user(Role::Employee, Some(HR))), Operation::Comment, Resource::Document(&doc))),
            DenyReason::WrongDepartment
        );
        assert_eq!(
            denied(can(Some(&user(Role::Employee, None)), Operation::Comment, Resource::Document(&doc))),
            DenyReason::WrongDepartment
        );
        assert!(can(Some(&user(Role::Admin, None)), Operation::Comment, Resource::Document(&doc))
            .is_permitted());
    }

    #[test]
    fn test_comment_requires_visible_document() {
        let draft = document(IT, "x", false);
        assert_eq!(
            denied(can(Some(&user(Role::Employee, Some(IT))), Operation::Comment, Resource::Document(&draft))),
            DenyReason::Unpublished
        );
        assert_eq!(
            denied(can(Some(&user(Role::Manager, Some(IT))), Operation::Comment, Resource::Document(&draft))),
            DenyReason::Unpublished
        );
        let editor = with_grants(user(Role::Employee, Some(IT)), Grants::MANAGE_DOCUMENTS);
        assert!(can(Some(&editor), Operation::Comment, Resource::Document(&draft)).is_permitted());
    }

    #[test]
    fn test_delete_comment_rules() {
        let author = user(Role::Employee, Some(IT));
        let doc = document(IT, "doc-author", true);
        let c = comment(&doc, &author.user_id);
        let target = Resource::Comment {
            comment: &c,
            document: &doc,
        };

        assert!(can(Some(&author), Operation::Delete, target).is_permitted());
        assert!(can(Some(&user(Role::Manager, Some(IT))), Operation::Delete, target).is_permitted());
        assert!(can(Some(&user(Role::Admin, None)), Operation::Delete, target).is_permitted());

        assert_eq!(
            denied(can(Some(&user(Role::Employee, Some(IT))), Operation::Delete, target)),
            DenyReason::NotOwner
        );
        assert_eq!(
            denied(can(Some(&user(Role::Manager, Some(HR))), Operation::Delete, target)),
            DenyReason::WrongDepartment
        );
    }

    #[test]
    fn test_moderation_scope() {
        let manager = user(Role::Manager, Some(IT));
        assert_eq!(
            scope(Some(&manager), Operation::ModerateComments, ResourceKind::Comment),
            Ok(Scope::department(IT.to_string()))
        );
        assert_eq!(
            scope(Some(&user(Role::Employee, Some(IT))), Operation::ModerateComments, ResourceKind::Comment),
            Err(DenyReason::InsufficientRole)
        );
        assert_eq!(
            scope(Some(&user(Role::Manager, None)), Operation::ModerateComments, ResourceKind::Comment),
            Err(DenyReason::NoDepartment)
        );

        let doc = document(HR, "x", true);
        let c = comment(&doc, "y");
        assert_eq!(
            denied(can(
                Some(&manager),
                Operation::ModerateComments,
                Resource::Comment { comment: &c, document: &doc }
            )),
            DenyReason::WrongDepartment
        );
    }

    #[test]
    fn test_publish_rules() {
        let manager = user(Role::Manager, Some(IT));
        let own = document(IT, "x", false);
        let foreign = document(HR, "x", false);
        assert!(can(Some(&manager), Operation::Publish, Resource::Document(&own)).is_permitted());
        assert_eq!(
            denied(can(Some(&manager), Operation::Publish, Resource::Document(&foreign))),
            DenyReason::WrongDepartment
        );
        assert_eq!(
            denied(can(Some(&user(Role::Employee, Some(IT))), Operation::Publish, Resource::Document(&own))),
            DenyReason::InsufficientRole
        );

        let editor = with_grants(user(Role::Employee, Some(IT)), Grants::MANAGE_DOCUMENTS);
        assert_eq!(
            scope(Some(&editor), Operation::Publish, ResourceKind::Document),
            Ok(Scope::unrestricted())
        );
        assert_eq!(
            scope(Some(&manager), Operation::Publish, ResourceKind::Document),
            Ok(Scope::department(IT.to_string()))
        );
    }

    #[test]
    fn test_category_rules() {
        let it_category = Category::new("Guides", IT, "");
        let manager = user(Role::Manager, Some(IT));
        assert!(can(Some(&manager), Operation::Create, Resource::Category(&it_category)).is_permitted());
        assert!(can(Some(&manager), Operation::View, Resource::Category(&it_category)).is_permitted());

        let hr_manager = user(Role::Manager, Some(HR));
        assert_eq!(
            denied(can(Some(&hr_manager), Operation::Create, Resource::Category(&it_category))),
            DenyReason::WrongDepartment
        );
        assert_eq!(
            denied(can(Some(&user(Role::Employee, Some(IT))), Operation::Create, Resource::Category(&it_category))),
            DenyReason::InsufficientRole
        );
        let curator = with_grants(user(Role::Employee, Some(HR)), Grants::MANAGE_CATEGORIES);
        assert!(can(Some(&curator), Operation::Create, Resource::Category(&it_category)).is_permitted());
    }

    #[test]
    fn test_department_rules() {
        let employee = user(Role::Employee, None);
        assert!(can(Some(&employee), Operation::List, Resource::Kind(ResourceKind::Department))
            .is_permitted());
        assert_eq!(
            denied(can(Some(&user(Role::Manager, Some(IT))), Operation::Create, Resource::Kind(ResourceKind::Department))),
            DenyReason::InsufficientRole
        );
        let planner = with_grants(user(Role::Employee, Some(IT)), Grants::MANAGE_DEPARTMENTS);
        assert!(can(Some(&planner), Operation::Create, Resource::Kind(ResourceKind::Department))
            .is_permitted());
    }

    #[test]
    fn test_assign_department() {
        let mut record = User::new("newcomer", Role::Employee, None);
        let newcomer = record.principal();
        assert!(can(Some(&newcomer), Operation::AssignDepartment, Resource::User(&record)).is_permitted());

        record.department_id = Some(IT.to_string());
        let assigned = record.principal();
        assert_eq!(
            denied(can(Some(&assigned), Operation::AssignDepartment, Resource::User(&record))),
            DenyReason::InsufficientRole
        );

        let other = User::new("someone-else", Role::Employee, None);
        assert_eq!(
            denied(can(Some(&newcomer), Operation::AssignDepartment, Resource::User(&other))),
            DenyReason::InsufficientRole
        );
        assert!(can(Some(&user(Role::Admin, None)), Operation::AssignDepartment, Resource::User(&other))
            .is_permitted());
    }

    #[test]
    fn test_user_list_scope() {
        assert_eq!(
            scope(Some(&user(Role::Manager, Some(HR))), Operation::List, ResourceKind::User),
            Ok(Scope::department(HR.to_string()))
        );
        assert_eq!(
            scope(Some(&user(Role::Employee, Some(HR))), Operation::List, ResourceKind::User),
            Err(DenyReason::InsufficientRole)
        );
    }

    #[test]
    fn test_unknown_combinations_fail_closed() {
        let manager = user(Role::Manager, Some(IT));
        assert_eq!(
            denied(can(Some(&manager), Operation::Comment, Resource::Kind(ResourceKind::User))),
            DenyReason::InsufficientRole
        );
    }

    #[test]
    fn test_require_maps_denials_to_errors() {
        let newcomer = user(Role::Employee, None);
        let doc = document(IT, "x", true);
        assert!(matches!(
            require(&newcomer, Operation::View, Resource::Document(&doc)),
            Err(AppError::NeedsDepartment)
        ));
        let outsider = user(Role::Employee, Some(HR));
        assert!(matches!(
            require(&outsider, Operation::View, Resource::Document(&doc)),
            Err(AppError::Forbidden(DenyReason::WrongDepartment))
        ));
    }
}
