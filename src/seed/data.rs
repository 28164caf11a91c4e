//! Demo catalogue: two brands with their materials, a studio with rooms,
//! streaming platforms and a handful of scheduled shows.

use serde_json::{json, Value};

pub(super) fn brands() -> Vec<Value> {
    vec![
        json!({"name": "Acme", "description": "Outdoor gear", "metadata": {"tier": "gold"}}),
        json!({"name": "Northwind", "description": "Kitchenware"}),
    ]
}

pub(super) fn platforms() -> Vec<Value> {
    vec![
        json!({"name": "Twitch", "url": "https://twitch.tv"}),
        json!({"name": "YouTube", "url": "https://youtube.com"}),
        json!({"name": "TikTok", "url": "https://tiktok.com", "is_active": false}),
    ]
}

pub(super) fn studios() -> Vec<Value> {
    vec![json!({"name": "Harbour Studio", "address": "1 Pier Road"})]
}

pub(super) fn users() -> Vec<Value> {
    vec![
        json!({"email": "producer@example.com", "name": "Sam Producer"}),
        json!({"email": "reviewer@example.com", "name": "Alex Reviewer"}),
    ]
}

pub(super) fn studio_rooms(studio: &str) -> Vec<Value> {
    vec![
        json!({"studio": studio, "name": "Room A", "capacity": 12}),
        json!({"studio": studio, "name": "Room B", "capacity": 4}),
    ]
}

pub(super) fn materials(acme: &str, northwind: &str) -> Vec<Value> {
    vec![
        json!({"brand": acme, "name": "Tent launch deck", "material_type": "slides"}),
        json!({"brand": acme, "name": "Backpack teaser", "material_type": "video", "url": "https://cdn.example.com/teaser.mp4"}),
        json!({"brand": northwind, "name": "Pan close-ups", "material_type": "images"}),
    ]
}

pub(super) fn shows(acme: &str, northwind: &str, room: &str) -> Vec<Value> {
    vec![
        json!({
            "brand": acme,
            "studio_room": room,
            "name": "Acme Summer Launch",
            "start_time": "2024-06-01T18:00:00Z",
            "end_time": "2024-06-01T19:30:00Z",
            "status": "scheduled"
        }),
        json!({
            "brand": northwind,
            "name": "Northwind Cooking Hour",
            "start_time": "2024-06-03T17:00:00Z",
            "end_time": "2024-06-03T18:00:00Z"
        }),
    ]
}
