use sales_sync_core::model::{App, Bundle, Country, Discount, GameItem, Package, Partner};
use sqlx::QueryBuilder;

use crate::db::Store;
use crate::error::StoreError;

/// Batched insert-or-ignore for the lookup entity kinds a sales record can
/// reference. Callers dedup a page's worth of entities in memory before
/// calling these, so each call issues one statement per kind regardless of
/// how many rows referenced it.
impl Store {
    pub async fn upsert_apps(&self, apps: &[App]) -> Result<(), StoreError> {
        if apps.is_empty() {
            return Ok(());
        }
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("INSERT INTO apps (app_id, name) ");
        builder.push_values(apps, |mut row, app| {
            row.push_bind(app.app_id.0).push_bind(&app.name);
        });
        builder.push(" ON CONFLICT (app_id) DO NOTHING");
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    pub async fn upsert_packages(&self, packages: &[Package]) -> Result<(), StoreError> {
        if packages.is_empty() {
            return Ok(());
        }
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("INSERT INTO packages (package_id, name) ");
        builder.push_values(packages, |mut row, package| {
            row.push_bind(package.package_id.0).push_bind(&package.name);
        });
        builder.push(" ON CONFLICT (package_id) DO NOTHING");
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    pub async fn upsert_bundles(&self, bundles: &[Bundle]) -> Result<(), StoreError> {
        if bundles.is_empty() {
            return Ok(());
        }
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("INSERT INTO bundles (bundle_id, name) ");
        builder.push_values(bundles, |mut row, bundle| {
            row.push_bind(bundle.bundle_id.0).push_bind(&bundle.name);
        });
        builder.push(" ON CONFLICT (bundle_id) DO NOTHING");
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    pub async fn upsert_partners(&self, partners: &[Partner]) -> Result<(), StoreError> {
        if partners.is_empty() {
            return Ok(());
        }
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("INSERT INTO partners (partner_id, name) ");
        builder.push_values(partners, |mut row, partner| {
            row.push_bind(partner.partner_id.0).push_bind(&partner.name);
        });
        builder.push(" ON CONFLICT (partner_id) DO NOTHING");
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    pub async fn upsert_countries(&self, countries: &[Country]) -> Result<(), StoreError> {
        if countries.is_empty() {
            return Ok(());
        }
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("INSERT INTO countries (country_code, name) ");
        builder.push_values(countries, |mut row, country| {
            row.push_bind(country.country_code.0.clone()).push_bind(&country.name);
        });
        builder.push(" ON CONFLICT (country_code) DO NOTHING");
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    pub async fn upsert_game_items(&self, items: &[GameItem]) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("INSERT INTO game_items (game_item_id, name) ");
        builder.push_values(items, |mut row, item| {
            row.push_bind(item.game_item_id.0).push_bind(&item.name);
        });
        builder.push(" ON CONFLICT (game_item_id) DO NOTHING");
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    pub async fn upsert_discounts(&self, discounts: &[Discount]) -> Result<(), StoreError> {
        if discounts.is_empty() {
            return Ok(());
        }
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "INSERT INTO discounts (discount_id, description, percentage) ",
        );
        builder.push_values(discounts, |mut row, discount| {
            row.push_bind(discount.discount_id.0)
                .push_bind(&discount.description)
                .push_bind(discount.percentage);
        });
        builder.push(" ON CONFLICT (discount_id) DO NOTHING");
        builder.build().execute(&self.pool).await?;
        Ok(())
    }
}
