//! Registry fixtures shared by the worker and database tests

#![allow(dead_code)]

use chrono::NaiveDate;
use echallan_anpr::models::vehicle::Vehicle;

pub const REGISTERED_PLATE: &str = "MH12AB1234";
pub const SECOND_REGISTERED_PLATE: &str = "KA01EF2222";
pub const UNREGISTERED_PLATE: &str = "ZZZ9999X";

pub const REGISTRY: &[&str] = &[REGISTERED_PLATE, SECOND_REGISTERED_PLATE, "DL3CAB0001"];

pub fn registered_vehicle() -> Vehicle {
    Vehicle {
        vehicle_number: REGISTERED_PLATE.to_string(),
        owner_name: "Sahil Patil".to_string(),
        vehicle_model: "Maruti Swift".to_string(),
        vehicle_type: "Car".to_string(),
        contact_number: "9876543210".to_string(),
        registration_date: NaiveDate::from_ymd_opt(2019, 7, 14).expect("valid date"),
    }
}
