use anyhow::Context;
use chrono::Utc;

use crate::auth::demo_auth::DEMO_USERS;
use crate::db::models::{new_id, Category, Department, Document, User};
use crate::db::repositories::Repositories;

const DEMO_DEPARTMENTS: &[(&str, &str, &str)] = &[
    ("Information Technology", "it", "Infrastructure, support and development"),
    ("Human Resources", "hr", "Hiring, onboarding and staff policies"),
];

/// (department slug, category name)
const DEMO_CATEGORIES: &[(&str, &str)] = &[
    ("it", "Guides"),
    ("it", "Policies"),
    ("hr", "Forms"),
];

/// (slug, title, department slug, category name, author, published, content)
const DEMO_DOCUMENTS: &[(&str, &str, &str, &str, &str, bool, &str)] = &[
    (
        "installation-guide",
        "Installation Guide",
        "it",
        "Guides",
        "it-manager",
        true,
        "How to set up a new workstation: accounts, VPN and required software.",
    ),
    (
        "password-policy",
        "Password Policy",
        "it",
        "Policies",
        "it-manager",
        false,
        "Draft: minimum length, rotation and the password manager we use.",
    ),
    (
        "vacation-request",
        "Vacation Request",
        "hr",
        "Forms",
        "admin",
        true,
        "Submit vacation requests at least two weeks in advance.",
    ),
];

/// Seed demo departments, users, categories and documents.
///
/// Idempotent: records that already exist (by slug, username or name) are
/// left untouched.
pub async fn seed_demo_data(repos: &Repositories) -> anyhow::Result<()> {
    tracing::info!("Starting demo data seeding...");

    let mut departments = Vec::new();
    for (name, slug, description) in DEMO_DEPARTMENTS {
        let department = match repos.departments.find_by_slug(slug).await? {
            Some(existing) => existing,
            None => {
                let department = Department::new(name, Some(*slug), description);
                repos.departments.insert(department.clone()).await?;
                tracing::info!("Seeded department '{}'", slug);
                department
            }
        };
        departments.push(department);
    }
    let department_id = |slug: &str| -> anyhow::Result<String> {
        departments
            .iter()
            .find(|d| d.slug == slug)
            .map(|d| d.id.clone())
            .with_context(|| format!("unknown demo department '{slug}'"))
    };

    let mut users = Vec::new();
    for demo in DEMO_USERS {
        let user = match repos.users.find_by_username(demo.username).await? {
            Some(existing) => existing,
            None => {
                let mut user = User::new(
                    demo.username,
                    demo.role,
                    demo.department.map(&department_id).transpose()?,
                );
                user.email = format!("{}@demo.deptkb.local", demo.username);
                user.position = demo.position.to_string();
                user.grants = demo.grants;
                repos.users.insert(user.clone()).await?;
                tracing::info!("Seeded user '{}'", demo.username);
                user
            }
        };
        users.push(user);
    }

    let existing = repos
        .categories
        .list(&crate::access::Scope::unrestricted())
        .await?;
    let mut categories = Vec::new();
    for (department_slug, name) in DEMO_CATEGORIES {
        let department = department_id(*department_slug)?;
        let category = match existing
            .iter()
            .find(|c| c.name == *name && c.department_id == department)
        {
            Some(category) => category.clone(),
            None => {
                let category = Category::new(name, &department, "");
                repos.categories.insert(category.clone()).await?;
                category
            }
        };
        categories.push(category);
    }

    for (slug, title, department_slug, category_name, author, published, content) in DEMO_DOCUMENTS {
        if repos.documents.find_by_slug(slug).await?.is_some() {
            tracing::info!("Document '{}' already exists, skipping.", slug);
            continue;
        }

        let department = department_id(*department_slug)?;
        let category = categories
            .iter()
            .find(|c| c.name == *category_name && c.department_id == department)
            .with_context(|| format!("unknown demo category '{category_name}'"))?;
        let author = users
            .iter()
            .find(|u| u.username == *author)
            .with_context(|| format!("unknown demo author '{author}'"))?;

        let now = Utc::now();
        repos
            .documents
            .insert(Document {
                id: new_id(),
                title: title.to_string(),
                slug: slug.to_string(),
                content: content.to_string(),
                author_id: author.id.clone(),
                category_id: category.id.clone(),
                department_id: department,
                file: None,
                is_published: *published,
                created_at: now,
                updated_at: now,
                last_comment_at: None,
            })
            .await?;
        tracing::info!("Seeded document '{}'", slug);
    }

    tracing::info!("Demo data seeding complete.");
    Ok(())
}
