//! Data types and associated functions and methods

use clap::ValueEnum;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use validator::{Validate, ValidationError};

use std::fmt;

/// How numeric building fields are rendered in API responses
#[derive(Clone, Copy, Debug, Deserialize, Display, PartialEq, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldSchema {
    /// Every field is a string, exactly as published by the source
    Text,
    /// Year, height and area are JSON numbers
    Numeric,
}

/// A flattened municipal building footprint.
///
/// Year, height and area are parsed from the source cells for filtering and aggregation. The
/// cell text itself is kept in [SourceText] so the text schema can echo it unchanged.
///
/// Buildings are (de)serialised in the layout of the public dataset, which is also the
/// document layout used in the store.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(from = "BuildingRecord", into = "BuildingRecord")]
pub struct Building {
    /// Building Identification Number (BIN)
    pub id: String,
    /// Year of construction completion
    pub construct_year: Option<i32>,
    /// Height from ground to roof
    pub height: Option<f64>,
    /// Area of the building polygon
    pub area: Option<f64>,
    /// Feature code describing the type of building
    pub kind: Option<String>,
    /// Cell text the numeric fields were parsed from
    pub source_text: SourceText,
}

/// Source cells of the numeric building fields, as published.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceText {
    pub construct_year: Option<String>,
    pub height: Option<String>,
    pub area: Option<String>,
}

impl Building {
    /// Create a building from parsed values, rendering each value as its source text.
    pub fn from_values(
        id: impl Into<String>,
        construct_year: Option<i32>,
        height: Option<f64>,
        area: Option<f64>,
        kind: Option<String>,
    ) -> Self {
        Building {
            id: id.into(),
            construct_year,
            height,
            area,
            kind,
            source_text: SourceText {
                construct_year: construct_year.map(|year| year.to_string()),
                height: height.map(|height| height.to_string()),
                area: area.map(|area| area.to_string()),
            },
        }
    }

    /// Height used by comparisons and aggregates. Missing heights count as zero.
    pub fn height_or_zero(&self) -> f64 {
        self.height.unwrap_or(0.0)
    }

    /// Area used by aggregates. Missing areas count as zero.
    pub fn area_or_zero(&self) -> f64 {
        self.area.unwrap_or(0.0)
    }

    /// Returns a serialisable view of this building in the requested schema.
    pub fn view(&self, schema: FieldSchema) -> BuildingView<'_> {
        match schema {
            FieldSchema::Numeric => BuildingView::Numeric(NumericBuilding::from(self)),
            FieldSchema::Text => BuildingView::Text(TextBuilding::from(self)),
        }
    }
}

/// A building document as published by the source and kept in the store.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct BuildingRecord {
    #[serde(default)]
    bin: String,
    #[serde(
        default,
        deserialize_with = "deserialize_cell",
        skip_serializing_if = "Option::is_none"
    )]
    cnstrct_yr: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_cell",
        skip_serializing_if = "Option::is_none"
    )]
    heightroof: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_cell",
        skip_serializing_if = "Option::is_none"
    )]
    shape_area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feat_code: Option<String>,
}

impl From<BuildingRecord> for Building {
    fn from(record: BuildingRecord) -> Self {
        Building {
            id: record.bin,
            construct_year: record.cnstrct_yr.as_deref().and_then(parse_year),
            height: record.heightroof.as_deref().and_then(parse_number),
            area: record.shape_area.as_deref().and_then(parse_number),
            kind: record.feat_code,
            source_text: SourceText {
                construct_year: record.cnstrct_yr,
                height: record.heightroof,
                area: record.shape_area,
            },
        }
    }
}

impl From<Building> for BuildingRecord {
    fn from(building: Building) -> Self {
        BuildingRecord {
            bin: building.id,
            cnstrct_yr: building.source_text.construct_year,
            heightroof: building.source_text.height,
            shape_area: building.source_text.area,
            feat_code: building.kind,
        }
    }
}

/// Parse a numeric cell. Blank, malformed and non-finite cells have no value.
fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parse a year cell. Fractional and out of range years have no value.
fn parse_year(text: &str) -> Option<i32> {
    parse_number(text)
        .filter(|year| year.fract() == 0.0)
        .filter(|year| *year >= i32::MIN as f64 && *year <= i32::MAX as f64)
        .map(|year| year as i32)
}

/// A building rendered for an API response
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BuildingView<'a> {
    Numeric(NumericBuilding<'a>),
    Text(TextBuilding<'a>),
}

/// A building with year, height and area rendered as numbers.
#[derive(Debug, Serialize)]
pub struct NumericBuilding<'a> {
    bin: &'a str,
    cnstrct_yr: Option<i32>,
    heightroof: Option<f64>,
    shape_area: Option<f64>,
    feat_code: Option<&'a str>,
}

impl<'a> From<&'a Building> for NumericBuilding<'a> {
    fn from(building: &'a Building) -> Self {
        NumericBuilding {
            bin: &building.id,
            cnstrct_yr: building.construct_year,
            heightroof: building.height,
            shape_area: building.area,
            feat_code: building.kind.as_deref(),
        }
    }
}

/// A building with every field rendered as the source text.
#[derive(Debug, Serialize)]
pub struct TextBuilding<'a> {
    bin: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cnstrct_yr: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    heightroof: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shape_area: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feat_code: Option<&'a str>,
}

impl<'a> From<&'a Building> for TextBuilding<'a> {
    fn from(building: &'a Building) -> Self {
        TextBuilding {
            bin: &building.id,
            cnstrct_yr: building.source_text.construct_year.as_deref(),
            heightroof: building.source_text.height.as_deref(),
            shape_area: building.source_text.area.as_deref(),
            feat_code: building.kind.as_deref(),
        }
    }
}

/// Visitor accepting a string, a number, or nothing at all.
///
/// Numbers are kept as their decimal text so that every cell has the same representation
/// whichever form the dataset used.
struct CellText;

impl<'de> Visitor<'de> for CellText {
    type Value = Option<String>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string, a number or null")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(Some(value.to_owned()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(Some(value))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(CellText)
    }
}

fn deserialize_cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(CellText)
}

/// All buildings constructed in one year
#[derive(Clone, Debug, PartialEq)]
pub struct YearGroup {
    /// Construction year shared by the group, `None` for buildings without one
    pub construct_year: Option<i32>,
    /// IDs of the buildings in the group, in store order
    pub buildings: Vec<String>,
}

impl YearGroup {
    /// Returns a serialisable view of this group in the requested schema.
    pub fn view(&self, schema: FieldSchema) -> YearGroupView<'_> {
        let construct_yr = match (self.construct_year, schema) {
            (None, _) => serde_json::Value::Null,
            (Some(year), FieldSchema::Numeric) => year.into(),
            (Some(year), FieldSchema::Text) => year.to_string().into(),
        };
        YearGroupView {
            construct_yr,
            count: self.buildings.len(),
            buildings: &self.buildings,
        }
    }
}

/// A year group rendered for an API response
#[derive(Debug, Serialize)]
pub struct YearGroupView<'a> {
    construct_yr: serde_json::Value,
    count: usize,
    buildings: &'a [String],
}

/// Aggregate statistics over every building
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Sum of all building areas
    pub total_area: f64,
    /// Mean roof height, zero when there are no buildings
    pub avg_height: f64,
    /// Number of buildings
    pub building_count: usize,
}

/// Query parameters for `/building`
#[derive(Debug, Deserialize, PartialEq, Validate)]
pub struct IdQuery {
    /// Building Identification Number
    #[validate(length(min = 1, message = "id must not be empty"))]
    pub id: String,
}

/// Query parameters for `/byyear`
#[derive(Debug, Deserialize, PartialEq, Validate)]
pub struct YearQuery {
    /// Year of construction
    #[validate(range(min = 0, max = 9999, message = "year must be between 0 and 9999"))]
    pub year: i32,
}

/// Query parameters for `/smallerthan`
#[derive(Debug, Deserialize, PartialEq, Validate)]
#[validate(schema(function = "validate_height_query"))]
pub struct HeightQuery {
    /// Maximum roof height, inclusive
    pub height: f64,
}

/// Validate a height limit
fn validate_height_query(query: &HeightQuery) -> Result<(), ValidationError> {
    if !query.height.is_finite() || query.height < 0.0 {
        let mut error = ValidationError::new("height must be a non-negative number");
        error.add_param("height".into(), &query.height.to_string());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use serde_test::{assert_de_tokens, assert_de_tokens_error, Token};

    #[test]
    fn test_source_strings() {
        let building = test_utils::building("1001", Some(1925), Some(21.5), Some(120.25));
        assert_de_tokens(
            &building,
            &[
                Token::Map { len: None },
                Token::Str("bin"),
                Token::Str("1001"),
                Token::Str("cnstrct_yr"),
                Token::Str("1925"),
                Token::Str("heightroof"),
                Token::Str("21.5"),
                Token::Str("shape_area"),
                Token::Str("120.25"),
                Token::Str("feat_code"),
                Token::Some,
                Token::Str("2100"),
                Token::Str("the_geom"),
                Token::Str("MULTIPOLYGON"),
                Token::MapEnd,
            ],
        );
    }

    #[test]
    fn test_numeric_cells() {
        let building = test_utils::building("1001", Some(1925), Some(21.5), Some(120.25));
        assert_de_tokens(
            &building,
            &[
                Token::Map { len: None },
                Token::Str("bin"),
                Token::Str("1001"),
                Token::Str("cnstrct_yr"),
                Token::Some,
                Token::I32(1925),
                Token::Str("heightroof"),
                Token::Some,
                Token::F64(21.5),
                Token::Str("shape_area"),
                Token::Some,
                Token::F64(120.25),
                Token::Str("feat_code"),
                Token::Some,
                Token::Str("2100"),
                Token::MapEnd,
            ],
        );
    }

    #[test]
    fn test_blank_and_missing_fields() {
        let building = Building {
            id: "1002".to_string(),
            source_text: SourceText {
                construct_year: Some(String::new()),
                height: Some("n/a".to_string()),
                area: None,
            },
            ..Default::default()
        };
        assert_de_tokens(
            &building,
            &[
                Token::Map { len: None },
                Token::Str("bin"),
                Token::Str("1002"),
                Token::Str("cnstrct_yr"),
                Token::Str(""),
                Token::Str("heightroof"),
                Token::Str("n/a"),
                Token::Str("shape_area"),
                Token::None,
                Token::MapEnd,
            ],
        );
    }

    #[test]
    fn test_text_view_echoes_source() {
        let source = serde_json::json!({
            "bin": "1",
            "cnstrct_yr": "1925",
            "heightroof": "21.50",
            "shape_area": "1.5E3",
            "feat_code": "2100",
        });
        let building: Building = serde_json::from_value(source.clone()).unwrap();
        assert_eq!(building.height, Some(21.5));
        assert_eq!(building.area, Some(1500.0));
        assert_eq!(
            serde_json::to_value(building.view(FieldSchema::Text)).unwrap(),
            source
        );
        assert_eq!(
            serde_json::to_value(building.view(FieldSchema::Numeric)).unwrap(),
            serde_json::json!({
                "bin": "1",
                "cnstrct_yr": 1925,
                "heightroof": 21.5,
                "shape_area": 1500.0,
                "feat_code": "2100",
            })
        );
    }

    #[test]
    fn test_unparseable_cell_kept_as_text() {
        let building: Building =
            serde_json::from_str(r#"{"bin": "1", "heightroof": "n/a"}"#).unwrap();
        assert_eq!(building.height, None);
        assert_eq!(building.height_or_zero(), 0.0);
        assert_eq!(
            serde_json::to_value(building.view(FieldSchema::Text)).unwrap(),
            serde_json::json!({"bin": "1", "heightroof": "n/a"})
        );
        assert_eq!(
            serde_json::to_value(building.view(FieldSchema::Numeric)).unwrap(),
            serde_json::json!({
                "bin": "1",
                "cnstrct_yr": null,
                "heightroof": null,
                "shape_area": null,
                "feat_code": null,
            })
        );
    }

    #[test]
    fn test_document_keeps_source_text() {
        let building: Building =
            serde_json::from_str(r#"{"bin": "1", "heightroof": "21.50", "shape_area": 12}"#)
                .unwrap();
        let document = serde_json::to_value(&building).unwrap();
        assert_eq!(
            document,
            serde_json::json!({"bin": "1", "heightroof": "21.50", "shape_area": "12"})
        );
        let decoded: Building = serde_json::from_value(document).unwrap();
        assert_eq!(decoded, building);
    }

    #[test]
    fn test_fractional_year_is_missing() {
        let building: Building =
            serde_json::from_str(r#"{"bin": "1", "cnstrct_yr": "1925.5"}"#).unwrap();
        assert_eq!(building.construct_year, None);
    }

    #[test]
    fn test_invalid_bin_type() {
        assert_de_tokens_error::<Building>(
            &[
                Token::Map { len: None },
                Token::Str("bin"),
                Token::Bool(true),
            ],
            "invalid type: boolean `true`, expected a string",
        );
    }

    #[test]
    fn test_numeric_view() {
        let building = test_utils::building("1001", Some(1925), Some(21.5), None);
        let json = serde_json::to_value(building.view(FieldSchema::Numeric)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "bin": "1001",
                "cnstrct_yr": 1925,
                "heightroof": 21.5,
                "shape_area": null,
                "feat_code": "2100",
            })
        );
    }

    #[test]
    fn test_text_view() {
        let building = test_utils::building("1001", Some(1925), Some(21.5), None);
        let json = serde_json::to_value(building.view(FieldSchema::Text)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "bin": "1001",
                "cnstrct_yr": "1925",
                "heightroof": "21.5",
                "feat_code": "2100",
            })
        );
    }

    #[test]
    fn test_year_group_views() {
        let group = YearGroup {
            construct_year: Some(1931),
            buildings: vec!["1".to_string(), "2".to_string()],
        };
        assert_eq!(
            serde_json::to_value(group.view(FieldSchema::Numeric)).unwrap(),
            serde_json::json!({"construct_yr": 1931, "count": 2, "buildings": ["1", "2"]})
        );
        assert_eq!(
            serde_json::to_value(group.view(FieldSchema::Text)).unwrap(),
            serde_json::json!({"construct_yr": "1931", "count": 2, "buildings": ["1", "2"]})
        );
        let unknown = YearGroup {
            construct_year: None,
            buildings: vec![],
        };
        assert_eq!(
            serde_json::to_value(unknown.view(FieldSchema::Text)).unwrap(),
            serde_json::json!({"construct_yr": null, "count": 0, "buildings": []})
        );
    }

    #[test]
    fn test_stats_field_names() {
        let stats = Stats {
            total_area: 10.0,
            avg_height: 2.5,
            building_count: 4,
        };
        assert_eq!(
            serde_json::to_value(stats).unwrap(),
            serde_json::json!({"totalArea": 10.0, "avgHeight": 2.5, "buildingCount": 4})
        );
    }

    #[test]
    fn test_id_query_validation() {
        IdQuery {
            id: "1001".to_string(),
        }
        .validate()
        .unwrap();
        assert!(IdQuery { id: String::new() }.validate().is_err());
    }

    #[test]
    fn test_year_query_validation() {
        YearQuery { year: 1925 }.validate().unwrap();
        YearQuery { year: 0 }.validate().unwrap();
        assert!(YearQuery { year: -1 }.validate().is_err());
        assert!(YearQuery { year: 10000 }.validate().is_err());
    }

    #[test]
    fn test_height_query_validation() {
        HeightQuery { height: 0.0 }.validate().unwrap();
        HeightQuery { height: 42.5 }.validate().unwrap();
        assert!(HeightQuery { height: -0.5 }.validate().is_err());
        assert!(HeightQuery { height: f64::NAN }.validate().is_err());
        assert!(HeightQuery {
            height: f64::INFINITY
        }
        .validate()
        .is_err());
    }
}
