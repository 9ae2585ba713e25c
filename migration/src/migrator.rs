use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202508010001_create_users::Migration),
            Box::new(migrations::m202508010002_create_rooms::Migration),
            Box::new(migrations::m202508010003_create_room_members::Migration),
            Box::new(migrations::m202508010004_create_unread_counters::Migration),
            Box::new(migrations::m202508010005_create_messages::Migration),
        ]
    }
}
