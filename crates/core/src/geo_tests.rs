// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use chrono::TimeZone;
use proptest::prelude::*;
use yare::parameterized;

fn at(lat: f64, lon: f64) -> Position {
    Position::new(lat, lon, Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap())
}

/// Latitude offset (degrees) that moves a point `meters` due north.
fn north_offset_deg(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_M).to_degrees()
}

#[test]
fn same_point_inside_default_radius() {
    let position = at(-23.5505, -46.6333);
    let anchor = GeofenceAnchor::with_default_radius(-23.5505, -46.6333).unwrap();

    let check = evaluate(&position, &anchor);
    assert_eq!(check.distance_m, 0.0);
    assert_eq!(check.display_distance_m(), 0);
    assert!(check.within);
}

#[test]
fn three_hundred_meters_is_outside_two_hundred_meter_fence() {
    let anchor = GeofenceAnchor::with_default_radius(-23.5505, -46.6333).unwrap();
    let position = at(-23.5505 + north_offset_deg(300.0), -46.6333);

    let check = evaluate(&position, &anchor);
    assert!(!check.within);
    assert_eq!(check.display_distance_m(), 300);
}

#[test]
fn boundary_distance_counts_as_inside() {
    let position = at(-23.5505 + north_offset_deg(150.0), -46.6320);
    let distance = haversine_m(position.latitude, position.longitude, -23.5505, -46.6333);
    let anchor = GeofenceAnchor::new(-23.5505, -46.6333, distance).unwrap();

    assert!(evaluate(&position, &anchor).within);
}

#[test]
fn rounding_is_display_only() {
    let anchor = GeofenceAnchor::new(0.0, 0.0, 200.0).unwrap();
    let position = at(north_offset_deg(200.4), 0.0);

    let check = evaluate(&position, &anchor);
    assert_eq!(check.display_distance_m(), 200);
    assert!(!check.within);
}

#[test]
fn known_city_distance() {
    // São Paulo to Rio de Janeiro, roughly 360 km.
    let d = haversine_m(-23.5505, -46.6333, -22.9068, -43.1729);
    assert!((d - 360_700.0).abs() < 2_000.0, "got {}", d);
}

#[test]
fn antipodal_points_do_not_produce_nan() {
    let d = haversine_m(0.0, 0.0, 0.0, 180.0);
    assert!(d.is_finite());
    assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
}

#[parameterized(
    latitude_high = { 90.5, 0.0 },
    latitude_low = { -91.0, 0.0 },
    longitude_high = { 0.0, 180.5 },
    nan = { f64::NAN, 0.0 },
)]
fn anchor_rejects_bad_coordinates(lat: f64, lon: f64) {
    assert!(matches!(
        GeofenceAnchor::new(lat, lon, 200.0),
        Err(Error::InvalidCoordinate { .. })
    ));
}

#[parameterized(
    zero = { 0.0 },
    negative = { -5.0 },
    infinite = { f64::INFINITY },
)]
fn anchor_rejects_bad_radius(radius: f64) {
    assert!(matches!(
        GeofenceAnchor::new(0.0, 0.0, radius),
        Err(Error::InvalidRadius(_))
    ));
}

#[test]
fn position_serializes_camel_case() {
    let position = at(1.5, 2.5).with_accuracy(12.0);
    let json = serde_json::to_value(position).unwrap();
    assert_eq!(json["latitude"], 1.5);
    assert_eq!(json["accuracy"], 12.0);
    assert!(json.get("capturedAt").is_some());
}

proptest! {
    #[test]
    fn haversine_is_symmetric(
        lat1 in -90.0f64..=90.0,
        lon1 in -180.0f64..=180.0,
        lat2 in -90.0f64..=90.0,
        lon2 in -180.0f64..=180.0,
    ) {
        let ab = haversine_m(lat1, lon1, lat2, lon2);
        let ba = haversine_m(lat2, lon2, lat1, lon1);
        prop_assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn haversine_of_a_point_with_itself_is_zero(
        lat in -90.0f64..=90.0,
        lon in -180.0f64..=180.0,
    ) {
        prop_assert_eq!(haversine_m(lat, lon, lat, lon), 0.0);
    }

    #[test]
    fn haversine_is_non_negative_and_bounded(
        lat1 in -90.0f64..=90.0,
        lon1 in -180.0f64..=180.0,
        lat2 in -90.0f64..=90.0,
        lon2 in -180.0f64..=180.0,
    ) {
        let d = haversine_m(lat1, lon1, lat2, lon2);
        prop_assert!(d >= 0.0);
        prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_M + 1.0);
    }
}
