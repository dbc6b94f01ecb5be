use crate::icon::{dominant_type, type_counts, TypePalette};
use crate::types::{CoordKey, Organization};
use geo::Point;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone)]
pub struct LocationGroup {
    pub key: CoordKey,
    /// x = longitude, y = latitude.
    pub point: Point<f64>,
    /// Indices into the organization list, in input order.
    pub members: Vec<usize>,
}

impl LocationGroup {
    pub fn organizations<'a>(&'a self, records: &'a [Organization]) -> impl Iterator<Item = &'a Organization> + 'a {
        self.members.iter().filter_map(move |&i| records.get(i))
    }
}

/// Organizations keyed by their exact coordinate pair, in first-seen key order.
#[derive(Debug, Clone, Default)]
pub struct LocationGroups {
    groups: Vec<LocationGroup>,
    by_key: HashMap<CoordKey, usize>,
}

impl LocationGroups {
    pub fn get(&self, key: &CoordKey) -> Option<&LocationGroup> {
        self.by_key.get(key).map(|&i| &self.groups[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of organizations placed on the map.
    pub fn mapped_count(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }
}

pub fn group_by_coordinate(records: &[Organization]) -> LocationGroups {
    let mut grouped = LocationGroups::default();

    for (index, org) in records.iter().enumerate() {
        let Some((lat, lng)) = org.coordinates() else {
            continue;
        };
        let key = CoordKey::new(lat, lng);
        let slot = match grouped.by_key.get(&key) {
            Some(&slot) => slot,
            None => {
                grouped.groups.push(LocationGroup {
                    key: key.clone(),
                    point: Point::new(lng, lat),
                    members: Vec::new(),
                });
                grouped.by_key.insert(key, grouped.groups.len() - 1);
                grouped.groups.len() - 1
            }
        };
        grouped.groups[slot].members.push(index);
    }

    info!(
        "Grouped {} organizations into {} locations",
        grouped.mapped_count(),
        grouped.len()
    );
    grouped
}

// Wrapper for RTree indexing
#[derive(Debug)]
struct GroupEntry {
    slot: usize,
    position: [f64; 2],
}

impl RTreeObject for GroupEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for GroupEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Resolves a clicked position to the location group under it.
pub struct GroupIndex {
    tree: RTree<GroupEntry>,
}

impl GroupIndex {
    pub fn build(groups: &LocationGroups) -> Self {
        let entries = groups
            .iter()
            .enumerate()
            .map(|(slot, group)| GroupEntry {
                slot,
                position: [group.point.x(), group.point.y()],
            })
            .collect();
        GroupIndex { tree: RTree::bulk_load(entries) }
    }

    /// Nearest group within `tolerance` degrees of `(lat, lon)`.
    pub fn nearest<'a>(&self, groups: &'a LocationGroups, lat: f64, lon: f64, tolerance: f64) -> Option<&'a LocationGroup> {
        let query = [lon, lat];
        let entry = self.tree.nearest_neighbor(&query)?;
        if entry.distance_2(&query) > tolerance * tolerance {
            return None;
        }
        groups.groups.get(entry.slot)
    }
}

/// One point feature per location group for the map engine to place markers.
pub fn to_feature_collection(records: &[Organization], groups: &LocationGroups, palette: &TypePalette) -> FeatureCollection {
    let features = groups
        .iter()
        .map(|group| {
            let members: Vec<&Organization> = group.organizations(records).collect();
            let dominant = dominant_type(members.iter().copied()).unwrap_or_default();

            let mut properties = JsonObject::new();
            properties.insert("key".into(), group.key.as_str().into());
            properties.insert("count".into(), members.len().into());
            properties.insert("ids".into(), group.members.clone().into());
            properties.insert(
                "names".into(),
                members.iter().map(|o| o.name.clone()).collect::<Vec<_>>().into(),
            );
            properties.insert("color".into(), palette.color_for(&dominant).into());
            properties.insert("dominant_type".into(), dominant.into());
            // [type, count] pairs in first-seen order; clusters merge these for their icon.
            let counts = type_counts(members.iter().copied())
                .into_iter()
                .map(|(org_type, n)| serde_json::json!([org_type, n]))
                .collect::<Vec<_>>();
            properties.insert("type_counts".into(), counts.into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![group.point.x(), group.point.y()]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::read_organizations;
    use crate::types::org;
    use std::collections::HashSet;

    #[test]
    fn comma_and_dot_rows_share_one_group() {
        let csv = "OrganizationName;OrganizationType;Latitude;Longitude\n\
                   A;Startup;52,5;13,4\n\
                   B;Startup;52.5;13.4\n";
        let data = read_organizations(csv.as_bytes(), b';').unwrap();
        let groups = group_by_coordinate(&data.organizations);

        assert_eq!(groups.len(), 1);
        let group = groups.get(&CoordKey::new(52.5, 13.4)).unwrap();
        assert_eq!(group.members, vec![0, 1]);
    }

    #[test]
    fn signed_zero_rows_share_one_group() {
        let csv = "OrganizationName;OrganizationType;Latitude;Longitude\n\
                   A;Startup;0;13.4\n\
                   B;Startup;-0,0;13.4\n";
        let data = read_organizations(csv.as_bytes(), b';').unwrap();
        let groups = group_by_coordinate(&data.organizations);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups.iter().next().unwrap().key.as_str(), "0,13.4");
        assert_eq!(groups.iter().next().unwrap().members, vec![0, 1]);
    }

    #[test]
    fn groups_partition_the_mapped_records() {
        let records = vec![
            org("A", "Startup", "", Some((1.0, 2.0))),
            org("B", "Startup", "", None),
            org("C", "Investor", "", Some((1.0, 2.0))),
            org("D", "Startup", "", Some((1.0, 2.000001))),
            org("E", "Startup", "", Some((3.0, 4.0))),
        ];
        let groups = group_by_coordinate(&records);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups.mapped_count(), 4);

        let mut seen = HashSet::new();
        for group in groups.iter() {
            for &i in &group.members {
                assert!(seen.insert(i), "record {i} appears in two groups");
                let (lat, lng) = records[i].coordinates().unwrap();
                assert_eq!(group.key, CoordKey::new(lat, lng));
            }
        }
        assert_eq!(seen, HashSet::from([0, 2, 3, 4]));
    }

    #[test]
    fn group_order_follows_first_appearance() {
        let records = vec![
            org("A", "Startup", "", Some((5.0, 5.0))),
            org("B", "Startup", "", Some((1.0, 1.0))),
            org("C", "Startup", "", Some((5.0, 5.0))),
        ];
        let keys: Vec<String> = group_by_coordinate(&records).iter().map(|g| g.key.to_string()).collect();
        assert_eq!(keys, vec!["5,5", "1,1"]);
    }

    #[test]
    fn index_resolves_clicks_within_tolerance() {
        let records = vec![
            org("A", "Startup", "", Some((52.5, 13.4))),
            org("B", "Startup", "", Some((48.1, 11.5))),
        ];
        let groups = group_by_coordinate(&records);
        let index = GroupIndex::build(&groups);

        let hit = index.nearest(&groups, 52.505, 13.401, 0.01).unwrap();
        assert_eq!(hit.members, vec![0]);
        assert!(index.nearest(&groups, 50.0, 12.0, 0.01).is_none());
    }

    #[test]
    fn empty_index_finds_nothing() {
        let groups = group_by_coordinate(&[]);
        let index = GroupIndex::build(&groups);
        assert!(index.nearest(&groups, 0.0, 0.0, 1.0).is_none());
    }

    #[test]
    fn feature_collection_carries_group_summary() {
        let records = vec![
            org("A", "Investor", "", Some((52.5, 13.4))),
            org("B", "Startup", "", Some((52.5, 13.4))),
            org("C", "Startup", "", Some((52.5, 13.4))),
        ];
        let groups = group_by_coordinate(&records);
        let fc = to_feature_collection(&records, &groups, &TypePalette::default());

        assert_eq!(fc.features.len(), 1);
        let feature = &fc.features[0];
        assert_eq!(feature.property("count").and_then(|v| v.as_u64()), Some(3));
        assert_eq!(feature.property("dominant_type").and_then(|v| v.as_str()), Some("Startup"));
        assert_eq!(
            feature.property("type_counts"),
            Some(&serde_json::json!([["Investor", 1], ["Startup", 2]]))
        );
        match &feature.geometry.as_ref().unwrap().value {
            Value::Point(coords) => assert_eq!(coords, &vec![13.4, 52.5]),
            other => panic!("unexpected geometry {other:?}"),
        }
    }
}
