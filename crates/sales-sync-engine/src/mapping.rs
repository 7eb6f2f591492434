use sales_sync_core::model::{App, Bundle, Country, Discount, GameItem, Package, Partner, SalesRecord};
use sales_sync_core::types::{CountryCode, CredentialId, DateKey, RemoteId};
use sales_sync_remote::{parse_price_cents, parse_revenue_cents, DetailedSalesResponse, RawLookup};

/// Everything a page of detailed-sales results contributes to the store:
/// the mapped records plus the lookup rows the page's reference arrays
/// carried, deduplicated in-memory so accumulating many pages still issues
/// one upsert per distinct entity at flush time.
#[derive(Default)]
pub struct MappedPage {
    pub records: Vec<SalesRecord>,
    pub apps: Vec<App>,
    pub packages: Vec<Package>,
    pub bundles: Vec<Bundle>,
    pub partners: Vec<Partner>,
    pub countries: Vec<Country>,
    pub game_items: Vec<GameItem>,
    pub discounts: Vec<Discount>,
}

fn lookups_to_apps(raw: &[RawLookup]) -> Vec<App> {
    raw.iter()
        .filter_map(|l| Some(App { app_id: RemoteId(l.id.parse().ok()?), name: l.name.clone() }))
        .collect()
}

fn lookups_to_packages(raw: &[RawLookup]) -> Vec<Package> {
    raw.iter()
        .filter_map(|l| Some(Package { package_id: RemoteId(l.id.parse().ok()?), name: l.name.clone() }))
        .collect()
}

fn lookups_to_bundles(raw: &[RawLookup]) -> Vec<Bundle> {
    raw.iter()
        .filter_map(|l| Some(Bundle { bundle_id: RemoteId(l.id.parse().ok()?), name: l.name.clone() }))
        .collect()
}

fn lookups_to_partners(raw: &[RawLookup]) -> Vec<Partner> {
    raw.iter()
        .filter_map(|l| Some(Partner { partner_id: RemoteId(l.id.parse().ok()?), name: l.name.clone() }))
        .collect()
}

fn lookups_to_countries(raw: &[RawLookup]) -> Vec<Country> {
    raw.iter()
        .map(|l| Country { country_code: CountryCode::new(&l.id), name: l.name.clone() })
        .collect()
}

fn lookups_to_game_items(raw: &[RawLookup]) -> Vec<GameItem> {
    raw.iter()
        .filter_map(|l| Some(GameItem { game_item_id: RemoteId(l.id.parse().ok()?), name: l.name.clone() }))
        .collect()
}

/// Map one detailed-sales page into store-ready rows. `accumulator` merges
/// across every page fetched for a date so the caller can flush lookups
/// and records once per date instead of once per page.
pub fn map_page(
    credential_id: CredentialId,
    date: DateKey,
    page: DetailedSalesResponse,
    accumulator: &mut MappedPage,
) {
    accumulator.apps.extend(lookups_to_apps(&page.app_info));
    accumulator.packages.extend(lookups_to_packages(&page.package_info));
    accumulator.bundles.extend(lookups_to_bundles(&page.bundle_info));
    accumulator.partners.extend(lookups_to_partners(&page.partner_info));
    accumulator.countries.extend(lookups_to_countries(&page.country_info));
    accumulator.game_items.extend(lookups_to_game_items(&page.game_item_info));
    accumulator.discounts.extend(page.combined_discount_info.iter().filter_map(|d| {
        Some(Discount {
            discount_id: RemoteId(d.id.parse().ok()?),
            description: d.description.clone(),
            percentage: d.percentage,
        })
    }));

    for line in page.results {
        accumulator.records.push(SalesRecord {
            credential_id,
            date,
            line_item_type: line.line_item_type,
            app_id: RemoteId(line.app_id),
            package_id: line.package_id.map(RemoteId),
            bundle_id: line.bundle_id.map(RemoteId),
            partner_id: line.partner_id.map(RemoteId),
            game_item_id: line.game_item_id.map(RemoteId),
            country_code: CountryCode::new(&line.country_code),
            platform: line.platform,
            currency: line.currency,
            discount_id: line.discount_id.map(RemoteId),
            discount_percentage: line.discount_percentage,
            base_price_usd: parse_price_cents(&line.base_price),
            sale_price_usd: parse_price_cents(&line.sale_price),
            avg_sale_price_usd: parse_price_cents(&line.avg_sale_price_usd),
            gross_units_sold: line.gross_units_sold.unwrap_or(0),
            gross_units_returned: line.gross_units_returned.unwrap_or(0),
            gross_units_activated: line.gross_units_activated.unwrap_or(0),
            net_units_sold: line.net_units_sold.unwrap_or(0),
            gross_sales_usd: parse_revenue_cents(&line.gross_sales_usd),
            gross_returns_usd: parse_revenue_cents(&line.gross_returns_usd),
            net_sales_usd: parse_revenue_cents(&line.net_sales_usd),
            net_tax_usd: parse_revenue_cents(&line.net_tax_usd),
        });
    }
}

/// Dedup a page accumulator's lookup vectors by their key, keeping the
/// first-seen name for each — run once after all of a date's pages have
/// been folded in, right before the upserts.
pub fn dedup_lookups(page: &mut MappedPage) {
    dedup_by(&mut page.apps, |a| a.app_id);
    dedup_by(&mut page.packages, |p| p.package_id);
    dedup_by(&mut page.bundles, |b| b.bundle_id);
    dedup_by(&mut page.partners, |p| p.partner_id);
    dedup_by(&mut page.game_items, |g| g.game_item_id);
    dedup_by(&mut page.discounts, |d| d.discount_id);

    let mut seen = std::collections::HashSet::new();
    page.countries.retain(|c| seen.insert(c.country_code.clone()));
}

fn dedup_by<T, K: std::hash::Hash + Eq>(items: &mut Vec<T>, key: impl Fn(&T) -> K) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(key(item)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use sales_sync_remote::{RawDiscount, RawLookup, RawSalesLine};

    fn line(app_id: i64, country: &str) -> RawSalesLine {
        RawSalesLine {
            line_item_type: "sale".into(),
            app_id,
            package_id: None,
            bundle_id: None,
            partner_id: None,
            game_item_id: None,
            country_code: country.to_string(),
            platform: "steam".into(),
            currency: "USD".into(),
            discount_id: None,
            discount_percentage: None,
            base_price: Some("19.99".to_string()),
            sale_price: None,
            avg_sale_price_usd: None,
            gross_units_sold: Some(1),
            gross_units_returned: Some(0),
            gross_units_activated: Some(1),
            net_units_sold: Some(1),
            gross_sales_usd: Some("19.99".to_string()),
            gross_returns_usd: Some("0.00".to_string()),
            net_sales_usd: Some("19.99".to_string()),
            net_tax_usd: Some("0.00".to_string()),
        }
    }

    fn page_with(lines: Vec<RawSalesLine>, app_info: Vec<RawLookup>) -> DetailedSalesResponse {
        DetailedSalesResponse {
            results: lines,
            max_id: 0,
            app_info,
            package_info: vec![],
            bundle_info: vec![],
            partner_info: vec![],
            country_info: vec![RawLookup { id: "US".into(), name: "United States".into() }],
            game_item_info: vec![],
            combined_discount_info: vec![],
        }
    }

    #[test]
    fn dedups_repeated_lookup_entities_across_pages() {
        let credential_id = CredentialId::new();
        let date = DateKey::today();
        let mut acc = MappedPage::default();

        map_page(
            credential_id,
            date,
            page_with(
                vec![line(440, "US"), line(440, "US")],
                vec![RawLookup { id: "440".into(), name: "Example Game".into() }],
            ),
            &mut acc,
        );
        map_page(
            credential_id,
            date,
            page_with(vec![line(570, "US")], vec![RawLookup { id: "570".into(), name: "Other Game".into() }]),
            &mut acc,
        );
        dedup_lookups(&mut acc);

        assert_eq!(acc.records.len(), 3);
        assert_eq!(acc.apps.len(), 2);
        assert_eq!(acc.countries.len(), 1);
    }

    #[test]
    fn preserves_absent_vs_zero_price_distinction() {
        let mut raw = line(440, "US");
        raw.sale_price = Some("0.00".to_string());
        let mut acc = MappedPage::default();
        map_page(CredentialId::new(), DateKey::today(), page_with(vec![raw], vec![]), &mut acc);

        let record = &acc.records[0];
        assert_eq!(record.base_price_usd, Some(sales_sync_core::types::Cents(1999)));
        assert_eq!(record.sale_price_usd, Some(sales_sync_core::types::Cents(0)));
    }

    #[test]
    fn unparseable_revenue_defaults_to_zero_not_dropped() {
        let mut raw = line(440, "US");
        raw.gross_sales_usd = Some("garbage".to_string());
        let mut acc = MappedPage::default();
        map_page(CredentialId::new(), DateKey::today(), page_with(vec![raw], vec![]), &mut acc);

        assert_eq!(acc.records[0].gross_sales_usd, sales_sync_core::types::Cents(0));
    }

    #[test]
    fn discount_percentage_carried_from_combined_discount_info() {
        let mut raw = line(440, "US");
        raw.discount_id = Some(7);
        raw.discount_percentage = Some(25);
        let mut page = page_with(vec![raw], vec![]);
        page.combined_discount_info =
            vec![RawDiscount { id: "7".into(), description: "Summer sale".into(), percentage: Some(25) }];

        let mut acc = MappedPage::default();
        map_page(CredentialId::new(), DateKey::today(), page, &mut acc);
        dedup_lookups(&mut acc);

        assert_eq!(acc.discounts.len(), 1);
        assert_eq!(acc.discounts[0].percentage, Some(25));
        assert_eq!(acc.records[0].discount_percentage, Some(25));
    }
}
