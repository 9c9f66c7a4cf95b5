//! Read-only loader for the EVE static data export (SDE) SQLite dump.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use tracing::info;

use crate::domain::{Catalog, ItemInfo, TypeId};

/// Manufacturing in the industryActivity tables.
const MANUFACTURING_ACTIVITY: i64 = 1;

/// Category ids dropped outright during candidate enumeration.
const EXCLUDED_CATEGORIES: [i64; 2] = [29, 2];

/// Market-group subtrees excluded from candidate enumeration by name.
const EXCLUDED_MARKET_GROUPS: [&str; 3] = [
    "Special Edition Ships",
    "Faction & Storyline",
    "Faction Warfare",
];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Open the SDE file read-only; the catalog is never written to.
pub fn open(path: &Path) -> Result<Connection, CatalogError> {
    Ok(Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY,
    )?)
}

/// Pull the full production graph into memory. The SDE comfortably fits
/// and resolution touches it far too often for per-row queries.
pub fn load_catalog(conn: &Connection) -> Result<Catalog, CatalogError> {
    let mut catalog = Catalog::default();

    let mut stmt = conn.prepare("SELECT typeID, typeName, volume, groupID FROM invTypes")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, TypeId>(0)?,
            ItemInfo {
                name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                volume: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                group_id: row.get::<_, Option<TypeId>>(3)?.unwrap_or(0),
            },
        ))
    })?;
    for row in rows {
        let (id, info) = row?;
        catalog.types.insert(id, info);
    }

    let mut stmt = conn.prepare("SELECT groupID, categoryID FROM invGroups")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, TypeId>(0)?, row.get::<_, TypeId>(1)?))
    })?;
    for row in rows {
        let (group, category) = row?;
        catalog.group_categories.insert(group, category);
    }

    let mut stmt = conn.prepare(
        "SELECT typeID, productTypeID, quantity
         FROM industryActivityProducts
         WHERE activityID = ?1",
    )?;
    let rows = stmt.query_map([MANUFACTURING_ACTIVITY], |row| {
        Ok((
            row.get::<_, TypeId>(0)?,
            row.get::<_, TypeId>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;
    for row in rows {
        let (blueprint, product, quantity) = row?;
        catalog.product_blueprints.insert(product, blueprint);
        catalog.output_quantities.insert(product, quantity);
    }

    let mut stmt = conn.prepare(
        "SELECT typeID, materialTypeID, quantity
         FROM industryActivityMaterials
         WHERE activityID = ?1",
    )?;
    let rows = stmt.query_map([MANUFACTURING_ACTIVITY], |row| {
        Ok((
            row.get::<_, TypeId>(0)?,
            row.get::<_, TypeId>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;
    for row in rows {
        let (blueprint, material, quantity) = row?;
        catalog
            .blueprint_materials
            .entry(blueprint)
            .or_default()
            .push((material, quantity as f64));
    }

    info!(
        "catalog loaded: {} types, {} manufacturable products",
        catalog.types.len(),
        catalog.product_blueprints.len()
    );
    Ok(catalog)
}

/// Every published, market-listed manufacturing product outside the
/// excluded categories and market-group subtrees.
pub fn manufacturable_candidates(
    conn: &Connection,
    exclude_tech2: bool,
) -> Result<Vec<TypeId>, CatalogError> {
    let excluded_groups = excluded_market_groups(conn)?;

    let group_filter = if excluded_groups.is_empty() {
        String::new()
    } else {
        let ids: Vec<String> = excluded_groups.iter().map(ToString::to_string).collect();
        format!("AND t.marketGroupID NOT IN ({})", ids.join(","))
    };
    let tech2_filter = if exclude_tech2 {
        "AND t.typeName NOT LIKE '% II'"
    } else {
        ""
    };
    let categories: Vec<String> = EXCLUDED_CATEGORIES.iter().map(ToString::to_string).collect();

    // Ids come out of the database itself, so string assembly is safe here.
    let sql = format!(
        "SELECT DISTINCT p.productTypeID
         FROM industryActivityProducts p
         JOIN industryActivity a ON p.typeID = a.typeID
         JOIN invTypes t ON p.productTypeID = t.typeID
         JOIN invGroups g ON t.groupID = g.groupID
         WHERE a.activityID = {MANUFACTURING_ACTIVITY}
           AND g.categoryID NOT IN ({})
           AND t.published = 1
           AND t.marketGroupID IS NOT NULL
           {tech2_filter}
           {group_filter}",
        categories.join(","),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, TypeId>(0))?;
    let mut candidates = Vec::new();
    for row in rows {
        candidates.push(row?);
    }
    Ok(candidates)
}

/// Walk each excluded subtree root down through its children.
fn excluded_market_groups(conn: &Connection) -> Result<HashSet<i64>, CatalogError> {
    let mut excluded = HashSet::new();
    for name in EXCLUDED_MARKET_GROUPS {
        let mut stmt = conn.prepare(
            "WITH RECURSIVE mg AS (
                 SELECT marketGroupID
                 FROM invMarketGroups
                 WHERE marketGroupName LIKE ?1
                 UNION ALL
                 SELECT m.marketGroupID
                 FROM invMarketGroups m
                 JOIN mg ON m.parentGroupID = mg.marketGroupID
             )
             SELECT marketGroupID FROM mg",
        )?;
        let rows = stmt.query_map([format!("%{name}%")], |row| row.get::<_, i64>(0))?;
        for row in rows {
            excluded.insert(row?);
        }
    }
    Ok(excluded)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal SDE with one honest candidate and one trap per filter.
    fn seeded_connection() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory sqlite");
        conn.execute_batch(
            r#"
            CREATE TABLE invTypes (
                typeID INTEGER PRIMARY KEY,
                typeName TEXT,
                volume REAL,
                groupID INTEGER,
                published INTEGER,
                marketGroupID INTEGER
            );
            CREATE TABLE invGroups (groupID INTEGER PRIMARY KEY, categoryID INTEGER);
            CREATE TABLE industryActivity (typeID INTEGER, activityID INTEGER);
            CREATE TABLE industryActivityProducts (
                typeID INTEGER,
                productTypeID INTEGER,
                activityID INTEGER,
                quantity INTEGER
            );
            CREATE TABLE industryActivityMaterials (
                typeID INTEGER,
                materialTypeID INTEGER,
                activityID INTEGER,
                quantity INTEGER
            );
            CREATE TABLE invMarketGroups (
                marketGroupID INTEGER PRIMARY KEY,
                parentGroupID INTEGER,
                marketGroupName TEXT
            );

            INSERT INTO invGroups VALUES (100, 6), (101, 18), (102, 29);

            -- An ordinary manufacturable item and its inputs.
            INSERT INTO invTypes VALUES (1, 'Afterburner I', 5.0, 100, 1, 500);
            INSERT INTO invTypes VALUES (2, 'Tritanium', 0.01, 101, 1, 501);
            INSERT INTO invTypes VALUES (3, 'Afterburner I Blueprint', 0.01, 100, 1, NULL);
            INSERT INTO industryActivity VALUES (3, 1);
            INSERT INTO industryActivityProducts VALUES (3, 1, 1, 2);
            INSERT INTO industryActivityMaterials VALUES (3, 2, 1, 80);

            -- Tech-2 variant, filtered by name when requested.
            INSERT INTO invTypes VALUES (4, 'Afterburner II', 5.0, 100, 1, 500);
            INSERT INTO invTypes VALUES (5, 'Afterburner II Blueprint', 0.01, 100, 1, NULL);
            INSERT INTO industryActivity VALUES (5, 1);
            INSERT INTO industryActivityProducts VALUES (5, 4, 1, 1);

            -- Excluded category.
            INSERT INTO invTypes VALUES (6, 'Monocle', 0.1, 102, 1, 500);
            INSERT INTO invTypes VALUES (7, 'Monocle Blueprint', 0.1, 102, 1, NULL);
            INSERT INTO industryActivity VALUES (7, 1);
            INSERT INTO industryActivityProducts VALUES (7, 6, 1, 1);

            -- Unpublished product.
            INSERT INTO invTypes VALUES (8, 'Prototype Hull', 5.0, 100, 0, 500);
            INSERT INTO invTypes VALUES (9, 'Prototype Hull Blueprint', 5.0, 100, 1, NULL);
            INSERT INTO industryActivity VALUES (9, 1);
            INSERT INTO industryActivityProducts VALUES (9, 8, 1, 1);

            -- Product under an excluded market-group subtree.
            INSERT INTO invMarketGroups VALUES (600, NULL, 'Faction & Storyline');
            INSERT INTO invMarketGroups VALUES (601, 600, 'Storyline Frigates');
            INSERT INTO invTypes VALUES (10, 'Storyline Frigate', 2500.0, 100, 1, 601);
            INSERT INTO invTypes VALUES (11, 'Storyline Frigate Blueprint', 0.01, 100, 1, NULL);
            INSERT INTO industryActivity VALUES (11, 1);
            INSERT INTO industryActivityProducts VALUES (11, 10, 1, 1);

            -- A non-manufacturing activity row that must be ignored.
            INSERT INTO industryActivityProducts VALUES (3, 99, 8, 1);
            "#,
        )
        .expect("seed schema");
        conn
    }

    #[test]
    fn catalog_maps_reflect_the_manufacturing_tables() {
        let conn = seeded_connection();
        let catalog = load_catalog(&conn).unwrap();

        assert_eq!(catalog.item(2).unwrap().name, "Tritanium");
        assert_eq!(catalog.category_of(2), Some(18));
        assert_eq!(catalog.blueprint_for(1), Some(3));
        assert_eq!(catalog.output_quantity(1), 2);
        assert_eq!(catalog.materials(3).len(), 1);
        assert_eq!(catalog.materials(3)[0], (2, 80.0));
        // Activity 8 rows never become recipes.
        assert_eq!(catalog.blueprint_for(99), None);
    }

    #[test]
    fn candidate_filters_each_drop_their_target() {
        let conn = seeded_connection();

        let mut candidates = manufacturable_candidates(&conn, true).unwrap();
        candidates.sort_unstable();
        assert_eq!(candidates, vec![1]);

        let mut with_tech2 = manufacturable_candidates(&conn, false).unwrap();
        with_tech2.sort_unstable();
        assert_eq!(with_tech2, vec![1, 4]);
    }
}
