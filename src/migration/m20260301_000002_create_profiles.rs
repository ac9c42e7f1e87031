//! Migration: Create profiles table.
//!
//! One row per account; the primary key equals the account id so a
//! conflict-tolerant insert can guarantee at-most-one profile per account.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE profiles (
                    id UUID PRIMARY KEY
                        REFERENCES accounts(id) ON DELETE CASCADE,
                    email VARCHAR(255) NOT NULL,
                    first_name VARCHAR(100) NOT NULL DEFAULT '',
                    last_name VARCHAR(100) NOT NULL DEFAULT '',
                    country VARCHAR(100) NOT NULL DEFAULT '',
                    street_address VARCHAR(255) NOT NULL DEFAULT '',
                    city VARCHAR(100) NOT NULL DEFAULT '',
                    state VARCHAR(100) NOT NULL DEFAULT '',
                    zip_code VARCHAR(20) NOT NULL DEFAULT '',
                    username VARCHAR(100) NOT NULL DEFAULT '',
                    about TEXT NOT NULL DEFAULT '',
                    avatar_url VARCHAR(500),
                    resume_url VARCHAR(500),

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                -- Index for username lookup
                CREATE INDEX idx_profiles_username ON profiles(username);

                -- Trigger to update updated_at
                CREATE TRIGGER update_profiles_updated_at
                    BEFORE UPDATE ON profiles
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_profiles_updated_at ON profiles;
                DROP TABLE IF EXISTS profiles CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
