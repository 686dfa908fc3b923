//! Read-side query semantics shared by every [crate::repository::BuildingRepository].
//!
//! Filters are expressed as predicates so that the store can evaluate them while scanning, and
//! the in-memory repository can evaluate them over its cached slice. Ordering and aggregation
//! work on any iterator of buildings, owned or borrowed.

use crate::models::{Building, Stats, YearGroup};

use std::borrow::Borrow;
use std::collections::BTreeMap;

/// Matches the building with exactly this ID.
pub fn has_id(id: &str) -> impl Fn(&Building) -> bool + '_ {
    move |building| building.id == id
}

/// Matches buildings completed in `year`.
pub fn built_in(year: i32) -> impl Fn(&Building) -> bool {
    move |building| building.construct_year == Some(year)
}

/// Matches buildings whose roof is at most `height`. Buildings without a height count as zero.
pub fn no_taller_than(height: f64) -> impl Fn(&Building) -> bool {
    move |building| building.height_or_zero() <= height
}

/// Sort buildings by decreasing height, keeping store order between equal heights.
pub fn sort_by_height_desc<B: Borrow<Building>>(buildings: &mut [B]) {
    buildings.sort_by(|a, b| {
        b.borrow()
            .height_or_zero()
            .total_cmp(&a.borrow().height_or_zero())
    });
}

/// Group building IDs by construction year.
///
/// Groups are ordered by ascending year. Buildings without a year are collected into a final
/// group whose year is `None`, which is omitted when empty.
pub fn group_by_year<B, I>(buildings: I) -> Vec<YearGroup>
where
    B: Borrow<Building>,
    I: IntoIterator<Item = B>,
{
    let mut years: BTreeMap<i32, Vec<String>> = BTreeMap::new();
    let mut unknown = Vec::new();
    for building in buildings {
        let building = building.borrow();
        match building.construct_year {
            Some(year) => years.entry(year).or_default().push(building.id.clone()),
            None => unknown.push(building.id.clone()),
        }
    }
    let mut groups: Vec<YearGroup> = years
        .into_iter()
        .map(|(year, buildings)| YearGroup {
            construct_year: Some(year),
            buildings,
        })
        .collect();
    if !unknown.is_empty() {
        groups.push(YearGroup {
            construct_year: None,
            buildings: unknown,
        });
    }
    groups
}

/// Total area, mean height and count over all buildings.
///
/// Missing areas and heights contribute zero. The mean height of no buildings is zero.
pub fn stats<B, I>(buildings: I) -> Stats
where
    B: Borrow<Building>,
    I: IntoIterator<Item = B>,
{
    let (total_area, total_height, building_count) =
        buildings
            .into_iter()
            .fold((0.0, 0.0, 0_usize), |(area, height, count), building| {
                let building = building.borrow();
                (
                    area + building.area_or_zero(),
                    height + building.height_or_zero(),
                    count + 1,
                )
            });
    let avg_height = if building_count == 0 {
        0.0
    } else {
        total_height / building_count as f64
    };
    Stats {
        total_area,
        avg_height,
        building_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{building, sample_buildings};

    #[test]
    fn has_id_matches_exactly() {
        let buildings = sample_buildings();
        let found: Vec<&Building> = buildings.iter().filter(|b| has_id("1002")(*b)).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1002");
        assert!(!buildings.iter().any(has_id("100")));
    }

    #[test]
    fn built_in_year() {
        let buildings = sample_buildings();
        let ids: Vec<&str> = buildings
            .iter()
            .filter(|b| built_in(1931)(*b))
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(ids, ["1001", "1003"]);
        assert!(!buildings.iter().any(built_in(2020)));
    }

    #[test]
    fn no_taller_than_is_inclusive() {
        let buildings = sample_buildings();
        let ids: Vec<&str> = buildings
            .iter()
            .filter(|b| no_taller_than(30.0)(*b))
            .map(|b| b.id.as_str())
            .collect();
        // 1004 has no height and counts as zero.
        assert_eq!(ids, ["1002", "1004", "1005"]);
    }

    #[test]
    fn sort_by_height_desc_is_stable() {
        let mut buildings = vec![
            building("a", None, Some(10.0), None),
            building("b", None, Some(20.0), None),
            building("c", None, Some(10.0), None),
            building("d", None, None, None),
        ];
        sort_by_height_desc(&mut buildings);
        let ids: Vec<&str> = buildings.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c", "d"]);
    }

    #[test]
    fn sort_borrowed_buildings() {
        let buildings = sample_buildings();
        let mut borrowed: Vec<&Building> = buildings.iter().collect();
        sort_by_height_desc(&mut borrowed);
        assert_eq!(borrowed[0].id, "1001");
        assert_eq!(borrowed.last().unwrap().id, "1004");
    }

    #[test]
    fn group_by_year_orders_years() {
        let groups = group_by_year(sample_buildings());
        let years: Vec<Option<i32>> = groups.iter().map(|g| g.construct_year).collect();
        assert_eq!(years, [Some(1900), Some(1931), Some(1985), None]);
        assert_eq!(groups[1].buildings, ["1001", "1003"]);
        assert_eq!(groups[3].buildings, ["1005"]);
    }

    #[test]
    fn group_by_year_without_unknown_years() {
        let groups = group_by_year(&sample_buildings()[..2]);
        assert!(groups.iter().all(|g| g.construct_year.is_some()));
        assert!(group_by_year(Vec::<Building>::new()).is_empty());
    }

    #[test]
    fn stats_over_buildings() {
        let stats = stats(&sample_buildings());
        assert_eq!(stats.building_count, 5);
        assert_eq!(stats.total_area, 1000.0 + 250.0 + 400.0 + 50.0);
        assert_eq!(stats.avg_height, (381.0 + 25.5 + 102.0 + 0.0 + 12.5) / 5.0);
    }

    #[test]
    fn stats_of_nothing() {
        let stats = stats(Vec::<Building>::new());
        assert_eq!(stats.building_count, 0);
        assert_eq!(stats.total_area, 0.0);
        assert_eq!(stats.avg_height, 0.0);
    }
}
