use crate::models::request::VehicleClass;

const MINIMUM_FARE: i64 = 100;

/// Fare for a metered trip: base + per-km rate, rounded to whole rupees.
pub fn trip_fare(class: VehicleClass, distance_km: f64) -> i64 {
    let (base, per_km) = rate_card(class);
    let fare = base as f64 + per_km as f64 * distance_km.max(0.0);
    (fare.round() as i64).max(MINIMUM_FARE)
}

/// Tour seats are priced flat, not metered.
pub fn tour_fare(seats: u32) -> i64 {
    const PER_SEAT: i64 = 1_500;
    PER_SEAT * seats as i64
}

/// Freight vehicle class is derived from the declared cargo weight.
pub fn freight_class(weight_kg: f64) -> VehicleClass {
    if weight_kg <= 800.0 {
        VehicleClass::LightFreight
    } else if weight_kg <= 3_000.0 {
        VehicleClass::MediumFreight
    } else {
        VehicleClass::HeavyFreight
    }
}

fn rate_card(class: VehicleClass) -> (i64, i64) {
    match class {
        VehicleClass::Mini => (150, 40),
        VehicleClass::Sedan => (200, 55),
        VehicleClass::Suv => (300, 70),
        VehicleClass::LightFreight => (500, 80),
        VehicleClass::MediumFreight => (800, 110),
        VehicleClass::HeavyFreight => (1_200, 150),
        VehicleClass::Coach => (2_000, 90),
    }
}
