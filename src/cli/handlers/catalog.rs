//! Browse, category and menu command handlers
//!
//! Fetches through [`FavorClient`] and prints a plain-text listing.

use std::fmt::Write;

use crate::external::favor::{Browse, Category, FavorClient, MenuOverview, Merchant};

/// Handler for the catalog commands
pub struct CatalogCommandHandler<'a> {
    client: &'a FavorClient,
}

impl<'a> CatalogCommandHandler<'a> {
    pub fn new(client: &'a FavorClient) -> Self {
        Self { client }
    }

    pub async fn browse(&self) -> anyhow::Result<()> {
        let browse = self.client.fetch_browse_if_needed().await?;
        print!("{}", render_browse(&browse));
        Ok(())
    }

    pub async fn category(&self, id: &str) -> anyhow::Result<()> {
        let category = self.client.fetch_category_if_needed(id).await?;
        print!("{}", render_category(&category));
        Ok(())
    }

    pub async fn menu(&self, merchant_id: u64) -> anyhow::Result<()> {
        let menu = self.client.fetch_menu_if_needed(merchant_id).await?;
        print!("{}", render_menu(&menu));
        Ok(())
    }
}

/// `1299` -> `$12.99`
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}${}.{:02}", cents / 100, cents % 100)
}

fn merchant_line(out: &mut String, merchant: &Merchant) {
    let _ = write!(
        out,
        "  {:>8}  {}  ({}, {} delivery",
        merchant.id,
        merchant.name,
        merchant.distance_display_string,
        merchant.delivery_fee.display_delivery_fee
    );
    if let Some(rating) = merchant.rating {
        let _ = write!(out, ", rated {rating:.1}");
    }
    if !merchant.is_open {
        out.push_str(", closed");
    }
    out.push_str(")\n");
}

pub fn render_browse(browse: &Browse) -> String {
    let mut out = String::new();
    if browse.is_empty {
        out.push_str("Favor does not deliver to this location yet.\n");
        return out;
    }

    let _ = writeln!(out, "Cuisines ({}):", browse.categories.len());
    for category in &browse.categories {
        let _ = writeln!(out, "  {:<20} {}", category.id, category.name);
    }

    for section in browse.merchant_sections() {
        let _ = writeln!(out, "\n{}:", section.id());
        for merchant in &section.merchants {
            merchant_line(&mut out, merchant);
        }
    }
    out
}

pub fn render_category(category: &Category) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({} of {} merchants):",
        category.title,
        category.merchants.len(),
        category.pagination.total
    );
    for merchant in &category.merchants {
        merchant_line(&mut out, merchant);
    }
    out
}

pub fn render_menu(menu: &MenuOverview) -> String {
    let mut out = String::new();
    for sub_menu in &menu.sub_menus {
        let _ = writeln!(out, "{}", sub_menu.name);
        for section in &sub_menu.sections {
            let _ = writeln!(out, "  {}", section.name);
            for item in menu.items_for_section(section) {
                let _ = writeln!(out, "    {:<40} {:>8}", item.name, format_cents(item.price));
            }
        }
    }
    out
}
