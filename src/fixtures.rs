//! Reference data import used by the `load-ingredients` and `load-tags` commands.

use std::path::Path;

use serde::Deserialize;
use sqlx::{Pool, Postgres};

use crate::{
    actions::{create_ingredient, create_tag, find_or_create_unit},
    state::StartupError,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IngredientFixture {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TagFixture {
    pub name: String,
    pub slug: String,
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map(|extension| extension.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// `name,unit` per line. The unit is taken after the last comma so names may contain commas.
pub fn parse_ingredient_csv(text: &str) -> Result<Vec<IngredientFixture>, StartupError> {
    let mut items = vec![];

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || (index == 0 && line.eq_ignore_ascii_case("name,measurement_unit")) {
            continue;
        }

        let (name, unit) = line.rsplit_once(',').ok_or_else(|| {
            StartupError::Fixture(format!("line {}: expected `name,unit`", index + 1))
        })?;
        let (name, unit) = (name.trim().trim_matches('"'), unit.trim().trim_matches('"'));
        if name.is_empty() || unit.is_empty() {
            return Err(StartupError::Fixture(format!(
                "line {}: name and unit must not be empty",
                index + 1
            )));
        }

        items.push(IngredientFixture {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        });
    }

    Ok(items)
}

pub fn parse_ingredients(path: &Path) -> Result<Vec<IngredientFixture>, StartupError> {
    let text = std::fs::read_to_string(path)?;

    if is_csv(path) {
        parse_ingredient_csv(&text)
    } else {
        serde_json::from_str(&text).map_err(|e| StartupError::Fixture(e.to_string()))
    }
}

pub fn parse_tags(path: &Path) -> Result<Vec<TagFixture>, StartupError> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| StartupError::Fixture(e.to_string()))
}

/// Returns how many ingredients were new.
pub async fn load_ingredients(
    items: &[IngredientFixture],
    pool: &Pool<Postgres>,
) -> Result<usize, StartupError> {
    let mut created = 0;

    for item in items {
        let unit = find_or_create_unit(&item.measurement_unit, pool).await?;
        if create_ingredient(&item.name, unit.id, pool).await? {
            created += 1;
        }
    }

    log::info!("Loaded {created} new ingredients ({} in file)", items.len());
    Ok(created)
}

/// Returns how many tags were new.
pub async fn load_tags(items: &[TagFixture], pool: &Pool<Postgres>) -> Result<usize, StartupError> {
    let mut created = 0;

    for item in items {
        if create_tag(&item.name, &item.slug, pool).await?.is_some() {
            created += 1;
        }
    }

    log::info!("Loaded {created} new tags ({} in file)", items.len());
    Ok(created)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn csv_skips_header_and_blank_lines() {
        let items = parse_ingredient_csv("name,measurement_unit\nsalt,g\n\n\"milk, whole\",ml\n")
            .unwrap();

        assert_eq!(
            items,
            vec![
                IngredientFixture {
                    name: String::from("salt"),
                    measurement_unit: String::from("g"),
                },
                IngredientFixture {
                    name: String::from("milk, whole"),
                    measurement_unit: String::from("ml"),
                },
            ]
        );
    }

    #[test]
    fn csv_rejects_lines_without_unit() {
        assert!(parse_ingredient_csv("salt\n").is_err());
        assert!(parse_ingredient_csv("salt,\n").is_err());
    }

    #[test]
    fn json_fixtures_are_read_from_files() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"name": "abricot", "measurement_unit": "g"}}, {{"name": "egg", "measurement_unit": "pcs"}}]"#
        )
        .unwrap();

        let items = parse_ingredients(file.path()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].measurement_unit, "pcs");
    }

    #[test]
    fn csv_fixtures_are_detected_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "sugar,g").unwrap();

        let items = parse_ingredients(file.path()).unwrap();
        assert_eq!(items[0].name, "sugar");
    }

    #[test]
    fn tags_need_a_slug() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"name": "Breakfast"}}]"#).unwrap();

        assert!(parse_tags(file.path()).is_err());
    }
}
