use crate::routes::engine::{RouteCollection, RouteRecord};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    LineString { coordinates: Vec<[f64; 2]> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Feature for one route. Passthrough columns go in first so the computed
/// properties win on a name clash.
pub fn route_feature(route: &RouteRecord) -> Feature {
    let mut properties = Map::new();
    for (name, value) in &route.passthrough {
        properties.insert(name.clone(), Value::String(value.clone()));
    }
    properties.insert("id".into(), route.id.into());
    properties.insert("line".into(), route.line.into());
    properties.insert("origen".into(), route.origin_name.clone().into());
    properties.insert("destino".into(), route.destination_name.clone().into());
    properties.insert("dist_km".into(), route.dist_km.into());
    properties.insert("time_min".into(), route.time_min.into());
    properties.insert(
        "source".into(),
        serde_json::to_value(route.source).unwrap_or(Value::Null),
    );

    Feature {
        kind: "Feature",
        geometry: Geometry::LineString {
            coordinates: route.geometry.clone(),
        },
        properties,
    }
}

pub fn to_feature_collection(routes: &RouteCollection) -> FeatureCollection {
    FeatureCollection {
        kind: "FeatureCollection",
        features: routes.routes.iter().map(route_feature).collect(),
    }
}
