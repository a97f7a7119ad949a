use anyhow::Context;
use hotel_hub::hotels::HotelQuery;
use hotel_hub::session::SessionState;
use hotel_hub::{App, Config};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🏨 Hotel Hub - catalog export");
    info!("============================");

    let config = Config::load()?;
    let app = App::new(&config)?;

    match app.session.load() {
        SessionState::Authenticated(user) => {
            info!("Signed in as {}", user.display_name())
        }
        _ => info!("No active session, showing the public catalog"),
    }

    let hotels = app
        .queries
        .fetch(&HotelQuery::All)
        .await
        .context("Failed to load the hotel catalog")?;

    info!("✅ Loaded {} hotels\n", hotels.len());

    for (i, hotel) in hotels.iter().enumerate() {
        println!("{}. {} ({}★, rating {:.1})", i + 1, hotel.name, hotel.category.stars(), hotel.rating);
        println!("   {}", hotel.location());
        let offered: Vec<String> = hotel
            .rooms
            .offered()
            .map(|(kind, room)| format!("{} x{} at {:.2}", kind.label(), room.available, room.price))
            .collect();
        if !offered.is_empty() {
            println!("   Rooms: {}", offered.join(", "));
        }
        println!("   Images: {}", hotel.gallery.len());
        if !hotel.active {
            println!("   (inactive)");
        }
        println!("   ID: {}", hotel.id);
        println!();
    }

    for notice in app.notices.drain() {
        warn!("Unshown notice: {}", notice.message);
    }

    let json = serde_json::to_string_pretty(&hotels)?;
    tokio::fs::write("hotel_catalog.json", json)
        .await
        .context("Failed to write hotel_catalog.json")?;
    info!("💾 Saved catalog to hotel_catalog.json");

    Ok(())
}
