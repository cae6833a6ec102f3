//! Province → city → district lookup over the bundled region dataset.
//!
//! The dataset is a JSON object keyed by province name:
//!
//! ```json
//! {"广东省": {"adcode": "440000", "cities": {
//!     "深圳市": {"adcode": "440300", "districts": {"宝安区": {"adcode": "440306"}}}}}}
//! ```
//!
//! Object order in the file is significant and kept. Lookups never fail:
//! unknown names produce empty lists or `None`, since stale selections are
//! routine while a user walks the cascading pickers.

use std::fmt;
use std::io::Read;
use std::marker::PhantomData;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::DatasetError;

/// The four centrally administered municipalities.
pub const MUNICIPALITIES: [&str; 4] = ["北京市", "上海市", "天津市", "重庆市"];

/// Whether `province` is one of the four municipalities.
pub fn is_municipality(province: &str) -> bool {
    MUNICIPALITIES.contains(&province)
}

/// One administrative unit and its children, in dataset order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionNode {
    pub name: String,
    pub area_code: String,
    pub children: Vec<RegionNode>,
}

impl RegionNode {
    pub fn new(name: impl Into<String>, area_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            area_code: area_code.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<RegionNode>) -> Self {
        self.children = children;
        self
    }

    pub fn child(&self, name: &str) -> Option<&RegionNode> {
        self.children.iter().find(|c| c.name == name)
    }

    fn child_names(&self) -> Vec<String> {
        self.children.iter().map(|c| c.name.clone()).collect()
    }
}

/// Read-only region directory, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationDirectory {
    provinces: Vec<RegionNode>,
}

impl LocationDirectory {
    pub fn from_provinces(provinces: Vec<RegionNode>) -> Self {
        Self { provinces }
    }

    /// Parse the bundled dataset format.
    ///
    /// # Errors
    /// Returns [`DatasetError::Parse`] for malformed JSON or missing `adcode`s.
    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        let mut de = serde_json::Deserializer::from_str(json);
        let directory = Self::deserialize(&mut de)?;
        de.end()?;
        Ok(directory)
    }

    /// Parse the bundled dataset format from a reader.
    ///
    /// # Errors
    /// Returns [`DatasetError::Parse`] for malformed JSON or I/O failures.
    pub fn from_reader(reader: impl Read) -> Result<Self, DatasetError> {
        let mut de = serde_json::Deserializer::from_reader(reader);
        let directory = Self::deserialize(&mut de)?;
        de.end()?;
        Ok(directory)
    }

    /// Load the dataset file at `path`.
    ///
    /// # Errors
    /// Returns [`DatasetError::Io`] when the file cannot be read and
    /// [`DatasetError::Parse`] when it is malformed.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let directory = Self::from_reader(std::io::BufReader::new(file))?;
        tracing::info!(
            "Loaded {} provinces from {}",
            directory.len(),
            path.display()
        );
        Ok(directory)
    }

    /// Number of provinces.
    pub fn len(&self) -> usize {
        self.provinces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.provinces.is_empty()
    }

    pub fn province(&self, province: &str) -> Option<&RegionNode> {
        self.provinces.iter().find(|p| p.name == province)
    }

    pub fn city(&self, province: &str, city: &str) -> Option<&RegionNode> {
        self.province(province)?.child(city)
    }

    /// Province names in dataset order.
    pub fn list_provinces(&self) -> Vec<String> {
        self.provinces.iter().map(|p| p.name.clone()).collect()
    }

    /// City names under `province`, sorted.
    ///
    /// A municipality's single self-named city is returned as is. Unknown
    /// provinces yield an empty list.
    pub fn list_cities(&self, province: &str) -> Vec<String> {
        let Some(node) = self.province(province) else {
            tracing::debug!("Unknown province: {}", province);
            return Vec::new();
        };

        let mut cities = node.child_names();
        if !(cities.len() == 1 && cities[0] == province) {
            cities.sort();
        }
        cities
    }

    /// District names under (`province`, `city`) in dataset order.
    pub fn list_districts(&self, province: &str, city: &str) -> Vec<String> {
        self.city(province, city)
            .map(RegionNode::child_names)
            .unwrap_or_default()
    }

    /// Area code for a district, or for the city when `district` is `None`
    /// or empty.
    ///
    /// Returns `None` when any supplied segment is unknown.
    pub fn resolve_area_code(
        &self,
        province: &str,
        city: &str,
        district: Option<&str>,
    ) -> Option<String> {
        let city_node = self.city(province, city)?;
        let node = match district.filter(|d| !d.is_empty()) {
            Some(district) => city_node.child(district)?,
            None => city_node,
        };
        Some(node.area_code.clone())
    }

    /// Serialize back to the bundled dataset format, order preserved.
    ///
    /// # Errors
    /// Propagates serializer failures.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// Wire format: nested JSON objects keyed by name. The level key for children
// changes with depth ("cities" below a province, "districts" below a city).

const CHILD_KEYS: [&str; 2] = ["cities", "districts"];

struct Level<'a> {
    node: &'a RegionNode,
    depth: usize,
}

impl Serialize for Level<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let child_key = CHILD_KEYS.get(self.depth);
        let mut map = serializer.serialize_map(Some(1 + usize::from(child_key.is_some())))?;
        map.serialize_entry("adcode", &self.node.area_code)?;
        if let Some(key) = child_key {
            map.serialize_entry(
                key,
                &Children {
                    nodes: &self.node.children,
                    depth: self.depth + 1,
                },
            )?;
        }
        map.end()
    }
}

struct Children<'a> {
    nodes: &'a [RegionNode],
    depth: usize,
}

impl Serialize for Children<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for node in self.nodes {
            map.serialize_entry(
                &node.name,
                &Level {
                    node,
                    depth: self.depth,
                },
            )?;
        }
        map.end()
    }
}

impl Serialize for LocationDirectory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Children {
            nodes: &self.provinces,
            depth: 0,
        }
        .serialize(serializer)
    }
}

#[derive(Deserialize)]
struct RawDistrict {
    adcode: String,
}

#[derive(Deserialize)]
struct RawCity {
    adcode: String,
    #[serde(default, deserialize_with = "ordered_entries")]
    districts: Vec<(String, RawDistrict)>,
}

#[derive(Deserialize)]
struct RawProvince {
    adcode: String,
    #[serde(default, deserialize_with = "ordered_entries")]
    cities: Vec<(String, RawCity)>,
}

impl<'de> Deserialize<'de> for LocationDirectory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let provinces = ordered_entries::<_, RawProvince>(deserializer)?
            .into_iter()
            .map(|(name, province)| {
                let cities = province
                    .cities
                    .into_iter()
                    .map(|(name, city)| {
                        let districts = city
                            .districts
                            .into_iter()
                            .map(|(name, d)| RegionNode::new(name, d.adcode))
                            .collect();
                        RegionNode::new(name, city.adcode).with_children(districts)
                    })
                    .collect();
                RegionNode::new(name, province.adcode).with_children(cities)
            })
            .collect();
        Ok(Self { provinces })
    }
}

/// Deserialize a JSON object into its entries, keeping document order.
fn ordered_entries<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct EntriesVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a JSON object keyed by region name")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, T>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "广东省": {"adcode": "440000", "cities": {
            "深圳市": {"adcode": "440300", "districts": {
                "宝安区": {"adcode": "440306"},
                "福田区": {"adcode": "440304"},
                "南山区": {"adcode": "440305"}
            }},
            "广州市": {"adcode": "440100", "districts": {}},
            "东莞市": {"adcode": "441900", "districts": {}}
        }},
        "北京市": {"adcode": "110000", "cities": {
            "北京市": {"adcode": "110100", "districts": {
                "东城区": {"adcode": "110101"},
                "朝阳区": {"adcode": "110105"}
            }}
        }},
        "安徽省": {"adcode": "340000", "cities": {}}
    }"#;

    fn directory() -> LocationDirectory {
        LocationDirectory::from_json_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_provinces_keep_dataset_order() {
        assert_eq!(
            directory().list_provinces(),
            vec!["广东省", "北京市", "安徽省"]
        );
    }

    #[test]
    fn test_cities_sorted() {
        let mut expected = vec!["深圳市", "广州市", "东莞市"];
        expected.sort();
        assert_eq!(directory().list_cities("广东省"), expected);
    }

    #[test]
    fn test_municipality_single_city() {
        assert_eq!(directory().list_cities("北京市"), vec!["北京市"]);
    }

    #[test]
    fn test_unknown_province_has_no_cities() {
        assert!(directory().list_cities("火星省").is_empty());
        assert!(directory().list_cities("安徽省").is_empty());
    }

    #[test]
    fn test_districts_keep_dataset_order() {
        assert_eq!(
            directory().list_districts("广东省", "深圳市"),
            vec!["宝安区", "福田区", "南山区"]
        );
        assert!(directory().list_districts("广东省", "佛山市").is_empty());
        assert!(directory().list_districts("火星省", "深圳市").is_empty());
    }

    #[test]
    fn test_resolve_area_code_granularity() {
        let dir = directory();
        assert_eq!(
            dir.resolve_area_code("广东省", "深圳市", Some("宝安区")).as_deref(),
            Some("440306")
        );
        assert_eq!(
            dir.resolve_area_code("广东省", "深圳市", None).as_deref(),
            Some("440300")
        );
        assert_eq!(
            dir.resolve_area_code("北京市", "北京市", Some("朝阳区")).as_deref(),
            Some("110105")
        );
    }

    #[test]
    fn test_empty_district_means_city() {
        let dir = directory();
        assert_eq!(
            dir.resolve_area_code("广东省", "深圳市", Some("")).as_deref(),
            Some("440300")
        );
        assert_eq!(dir.resolve_area_code("广东省", "佛山市", Some("")), None);
    }

    #[test]
    fn test_from_reader_matches_from_str() {
        let from_reader = LocationDirectory::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(from_reader, directory());
        assert!(LocationDirectory::from_reader(&b"{\"x\": 1"[..]).is_err());
    }

    #[test]
    fn test_load_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("city_data.json");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(LocationDirectory::load(&path).unwrap(), directory());
    }

    #[test]
    fn test_resolve_area_code_misses() {
        let dir = directory();
        assert_eq!(dir.resolve_area_code("火星省", "深圳市", None), None);
        assert_eq!(dir.resolve_area_code("广东省", "佛山市", None), None);
        assert_eq!(dir.resolve_area_code("广东省", "深圳市", Some("龙华新区")), None);
    }

    #[test]
    fn test_is_municipality() {
        for name in ["北京市", "上海市", "天津市", "重庆市"] {
            assert!(is_municipality(name), "{name}");
        }
        for name in ["广东省", "北京", "河北省", "香港特别行政区", ""] {
            assert!(!is_municipality(name), "{name}");
        }
    }

    #[test]
    fn test_missing_children_keys_default_empty() {
        let dir = LocationDirectory::from_json_str(
            r#"{"台湾省": {"adcode": "710000"}, "澳门特别行政区": {"adcode": "820000",
                "cities": {"澳门特别行政区": {"adcode": "820000"}}}}"#,
        )
        .unwrap();
        assert!(dir.list_cities("台湾省").is_empty());
        assert!(dir.list_districts("澳门特别行政区", "澳门特别行政区").is_empty());
    }

    #[test]
    fn test_malformed_dataset_is_error() {
        assert!(LocationDirectory::from_json_str("[1, 2]").is_err());
        assert!(LocationDirectory::from_json_str(r#"{"广东省": {"cities": {}}}"#).is_err());
        assert!(LocationDirectory::from_json_str(r#"{"广东省": {"adcode": "440000"}} x"#).is_err());
    }

    #[test]
    fn test_json_output_preserves_order_and_shape() {
        let dir = directory();
        let json = dir.to_json_pretty().unwrap();
        assert_eq!(LocationDirectory::from_json_str(&json).unwrap(), dir);

        let guangdong = json.find("广东省").unwrap();
        let beijing = json.find("北京市").unwrap();
        assert!(guangdong < beijing);
        assert!(json.contains("\"districts\""));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocationDirectory::load(&dir.path().join("city_data.json")).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }
}
