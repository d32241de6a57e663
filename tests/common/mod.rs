#![allow(dead_code)]

use sea_orm::{ActiveValue::Set, ConnectionTrait, DatabaseConnection, DbBackend, Statement};

pub mod entity {
    pub mod category {
        use nested_set::NestedSetModelDerive as NestedSetModel;
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel, NestedSetModel)]
        #[sea_orm(table_name = "categories")]
        #[nested_set(entity_name = "Category", group_fields = "tenant_id", root_name = "Root")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub tenant_id: i32,
            pub name: String,
            pub lft: i32,
            pub rgt: i32,
            pub level: i32,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod menu_item {
        use nested_set::NestedSetModelDerive as NestedSetModel;
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel, NestedSetModel)]
        #[sea_orm(table_name = "menu_items")]
        #[nested_set(
            entity_name = "MenuItem",
            left_field = "lhs",
            right_field = "rhs",
            level_field = "depth",
            name_field = "title",
            root_name = "Menu",
            auto_create_root = false,
            advisory_lock = false
        )]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub title: String,
            pub lhs: i32,
            pub rhs: i32,
            pub depth: i32,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod page {
        use nested_set::NestedSetModelDerive as NestedSetModel;
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel, NestedSetModel)]
        #[sea_orm(table_name = "pages")]
        #[nested_set(entity_name = "Page", group_fields = "site_id, section", root_name = "Home")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub site_id: i32,
            pub section: Option<String>,
            pub name: String,
            pub lft: i32,
            pub rgt: i32,
            pub level: i32,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }
}

pub use entity::{category, menu_item, page};

pub fn named(name: &str) -> category::ActiveModel {
    category::ActiveModel {
        name: Set(name.to_owned()),
        ..Default::default()
    }
}

pub fn titled(title: &str) -> menu_item::ActiveModel {
    menu_item::ActiveModel {
        title: Set(title.to_owned()),
        ..Default::default()
    }
}

pub fn page_named(name: &str) -> page::ActiveModel {
    page::ActiveModel {
        name: Set(name.to_owned()),
        ..Default::default()
    }
}

pub async fn create_tables(db: &DatabaseConnection) -> Result<(), sea_orm::DbErr> {
    let backend = db.get_database_backend();
    let key = match backend {
        DbBackend::Postgres => "SERIAL PRIMARY KEY",
        _ => "INTEGER PRIMARY KEY AUTOINCREMENT",
    };

    db.execute(Statement::from_string(
        backend,
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id {key},
                tenant_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                lft INTEGER NOT NULL,
                rgt INTEGER NOT NULL,
                level INTEGER NOT NULL
            );
            "#
        ),
    ))
    .await?;

    db.execute(Statement::from_string(
        backend,
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS menu_items (
                id {key},
                title TEXT NOT NULL,
                lhs INTEGER NOT NULL,
                rhs INTEGER NOT NULL,
                depth INTEGER NOT NULL
            );
            "#
        ),
    ))
    .await?;

    db.execute(Statement::from_string(
        backend,
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS pages (
                id {key},
                site_id INTEGER NOT NULL,
                section TEXT NULL,
                name TEXT NOT NULL,
                lft INTEGER NOT NULL,
                rgt INTEGER NOT NULL,
                level INTEGER NOT NULL
            );
            "#
        ),
    ))
    .await?;

    Ok(())
}

/// `(name, left, right, level)` for every category of a tenant, in pre-order.
pub async fn layout(
    db: &impl ConnectionTrait,
    tenant: i32,
) -> Result<Vec<(String, i32, i32, i32)>, nested_set::NestedSetError> {
    let repo = nested_set::NestedSetRepository::<category::Model>::new();
    let rows = repo.forest(db, &(tenant,)).await?;
    Ok(rows
        .into_iter()
        .map(|node| (node.name, node.lft, node.rgt, node.level))
        .collect())
}

/// `(name, left, right, level)` for every page of one site section, in pre-order.
pub async fn page_layout(
    db: &impl ConnectionTrait,
    site: i32,
    section: Option<&str>,
) -> Result<Vec<(String, i32, i32, i32)>, nested_set::NestedSetError> {
    let repo = nested_set::NestedSetRepository::<page::Model>::new();
    let rows = repo
        .forest(db, &(site, section.map(str::to_owned)))
        .await?;
    Ok(rows
        .into_iter()
        .map(|node| (node.name, node.lft, node.rgt, node.level))
        .collect())
}

pub fn row(name: &str, left: i32, right: i32, level: i32) -> (String, i32, i32, i32) {
    (name.to_owned(), left, right, level)
}
