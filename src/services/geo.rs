// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geo helpers for segment exploration.
//!
//! Handles:
//! - Bounding box around a center point and radius
//! - Decoding explore polylines into GeoJSON for map clients

use crate::models::segment::ExploreSegment;
use geo::LineString;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};

/// Kilometers per degree of latitude (and of longitude at the equator).
const KM_PER_DEGREE: f64 = 111.32;

/// Default search radius when the client did not store one.
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

/// South-west / north-east corners of a search area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub sw_lat: f64,
    pub sw_lng: f64,
    pub ne_lat: f64,
    pub ne_lng: f64,
}

impl Bounds {
    /// Strava `bounds` query value: `sw_lat,sw_lng,ne_lat,ne_lng`.
    pub fn to_query_value(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.sw_lat, self.sw_lng, self.ne_lat, self.ne_lng
        )
    }
}

/// Wrap a longitude into `[-180, 180)`.
pub fn wrap_longitude(lng: f64) -> f64 {
    ((lng + 180.0) % 360.0 + 360.0) % 360.0 - 180.0
}

/// Clamp a latitude into `[-90, 90]`.
pub fn clamp_latitude(lat: f64) -> f64 {
    lat.clamp(-90.0, 90.0)
}

/// Square box of half-width `radius_km` around `(lat, lng)`.
///
/// Near the poles the longitude span is bounded by a tiny minimum
/// km-per-degree rather than dividing by zero.
pub fn bounds_from_center_radius(lat: f64, lng: f64, radius_km: f64) -> Bounds {
    let d_lat = radius_km / KM_PER_DEGREE;
    let km_per_deg_lng = (KM_PER_DEGREE * lat.to_radians().cos()).max(1e-6);
    let d_lng = radius_km / km_per_deg_lng;

    Bounds {
        sw_lat: clamp_latitude(lat - d_lat),
        sw_lng: wrap_longitude(lng - d_lng),
        ne_lat: clamp_latitude(lat + d_lat),
        ne_lng: wrap_longitude(lng + d_lng),
    }
}

/// Decode a precision-5 encoded polyline.
pub fn decode_points(points: &str) -> Option<LineString<f64>> {
    if points.is_empty() {
        return None;
    }
    match polyline::decode_polyline(points, 5) {
        Ok(line) => Some(line),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to decode segment polyline");
            None
        }
    }
}

/// Build a FeatureCollection with one LineString feature per segment.
///
/// Segments whose polyline cannot be decoded are left out.
pub fn segments_to_feature_collection(segments: &[ExploreSegment]) -> FeatureCollection {
    let features = segments
        .iter()
        .filter_map(|segment| {
            let line = decode_points(&segment.points)?;

            let mut properties = JsonObject::new();
            properties.insert("name".to_string(), segment.name.clone().into());
            properties.insert("distance".to_string(), segment.distance.into());
            properties.insert("avg_grade".to_string(), segment.avg_grade.into());
            properties.insert("climb_category".to_string(), segment.climb_category.into());

            Some(Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&line))),
                id: Some(geojson::feature::Id::Number(segment.id.into())),
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
