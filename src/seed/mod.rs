//! Demo data: two companies with one IPO and a prospectus pair each.

use crate::admin::Admin;
use crate::models::{NewCompany, RawIpoForm};
use anyhow::Result;
use tracing::info;

struct SeedIpo {
    name: &'static str,
    symbol: &'static str,
    logo: &'static str,
    form: [(&'static str, &'static str); 9],
    rhp: &'static str,
    drhp: &'static str,
}

const SEED: [SeedIpo; 2] = [
    SeedIpo {
        name: "Tata Technologies",
        symbol: "TATA",
        logo: "/logos/tata.png",
        form: [
            ("priceBand", "₹475 - ₹500"),
            ("openDate", "2023-11-22"),
            ("closeDate", "2023-11-24"),
            ("issueSize", "₹3,042.51 Cr"),
            ("issueType", "Book Built Issue IPO"),
            ("status", "LISTED"),
            ("ipoPrice", "500"),
            ("listingPrice", "1200"),
            ("listingGain", "140"),
        ],
        rhp: "/docs/tata-rhp.pdf",
        drhp: "/docs/tata-drhp.pdf",
    },
    SeedIpo {
        name: "Ola Electric",
        symbol: "OLA",
        logo: "/logos/ola.png",
        // Not listed yet, so prices and gains stay unknown.
        form: [
            ("priceBand", "₹125 - ₹135"),
            ("openDate", "2024-01-15"),
            ("closeDate", "2024-01-18"),
            ("issueSize", "₹2,500 Cr"),
            ("issueType", "Book Built Issue IPO"),
            ("status", "UPCOMING"),
            ("ipoPrice", ""),
            ("listingPrice", ""),
            ("listingGain", ""),
        ],
        rhp: "/docs/ola-rhp.pdf",
        drhp: "/docs/ola-drhp.pdf",
    },
];

fn form_for(company_id: i64, fields: &[(&str, &str)]) -> RawIpoForm {
    let get = |key: &str| {
        fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    };
    RawIpoForm {
        company_id: Some(company_id.to_string()),
        price_band: get("priceBand"),
        open_date: get("openDate"),
        close_date: get("closeDate"),
        issue_size: get("issueSize"),
        issue_type: get("issueType"),
        status: get("status"),
        ipo_price: get("ipoPrice"),
        listing_price: get("listingPrice"),
        listing_gain: get("listingGain"),
        current_return: get("currentReturn"),
        ..Default::default()
    }
}

/// Insert the demo data. Skipped when any IPO already exists.
pub fn run(admin: &Admin<'_>) -> Result<usize> {
    if admin.repo().ipo_count()? > 0 {
        info!("IPO table not empty, skipping seed");
        return Ok(0);
    }

    for seed in &SEED {
        let company = admin.create_company(&NewCompany {
            name: seed.name.to_string(),
            symbol: Some(seed.symbol.to_string()),
            logo: Some(seed.logo.to_string()),
        })?;
        let record = admin.create_ipo(&form_for(company.id, &seed.form))?;
        admin.save_documents(record.ipo.id, Some(seed.rhp), Some(seed.drhp))?;
    }

    info!("Seeded {} companies with IPOs and documents", SEED.len());
    Ok(SEED.len())
}
