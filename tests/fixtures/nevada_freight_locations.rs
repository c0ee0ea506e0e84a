//! Freight locations around Las Vegas and Reno for realistic fixtures.
//!
//! Coordinates are taken from OpenStreetMap at street level; OSRM snaps them
//! to the nearest routable road, so they work with the Nevada extract.

use dispatch_planner::Coordinate;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

// ============================================================================
// Las Vegas Valley distribution centers (pickups)
// ============================================================================

pub const VEGAS_WAREHOUSES: &[Location] = &[
    Location::new("North Las Vegas Speedway Commerce Park", 36.2706, -115.0223),
    Location::new("Cheyenne Logistics Center", 36.2185, -115.0986),
    Location::new("Henderson Gibson Road DC", 36.0398, -115.0189),
    Location::new("Arville Industrial", 36.0897, -115.2235),
    Location::new("Sunset Park Freight", 36.0714, -115.1362),
    Location::new("Apex Industrial Park", 36.3571, -114.9187),
];

// ============================================================================
// Las Vegas Valley retail drops (deliveries)
// ============================================================================

pub const VEGAS_RETAIL: &[Location] = &[
    Location::new("Summerlin Grocery", 36.1705, -115.3287),
    Location::new("Spring Valley Home Center", 36.1120, -115.2443),
    Location::new("Green Valley Market", 36.0341, -115.0826),
    Location::new("Downtown Container Park", 36.1675, -115.1393),
    Location::new("Centennial Hills Plaza", 36.2774, -115.2660),
    Location::new("Boulder Highway Hardware", 36.1168, -115.0586),
    Location::new("Silverado Ranch Pharmacy", 36.0127, -115.1532),
    Location::new("Nellis Commissary", 36.2410, -115.0440),
];

// ============================================================================
// Truck stops (driver positions)
// ============================================================================

pub const TRUCK_STOPS: &[Location] = &[
    Location::new("Las Vegas Blvd North Travel Center", 36.2626, -115.0512),
    Location::new("Jean Travel Plaza", 35.7783, -115.3256),
    Location::new("Sparks Truck Stop", 39.5395, -119.7365),
    Location::new("Boulder City Fuel", 35.9787, -114.8347),
];

// ============================================================================
// Reno / Sparks
// ============================================================================

pub const RENO_WAREHOUSES: &[Location] = &[
    Location::new("Tahoe Reno Industrial Center", 39.5335, -119.4452),
    Location::new("Sparks Industrial", 39.5167, -119.7369),
];

/// Every Las Vegas location, warehouses first.
pub fn vegas_locations() -> Vec<Location> {
    VEGAS_WAREHOUSES
        .iter()
        .chain(VEGAS_RETAIL)
        .cloned()
        .collect()
}
