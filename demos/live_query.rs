use futures::StreamExt;
use georange::{Distance, GeoIndex, Location, MemoryStore, QueryEvent};
use std::time::Duration;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug to see range subscriptions)
    env_logger::init();

    println!("=== georange - Live Query ===\n");

    let index = GeoIndex::new(MemoryStore::new());
    let downtown = Location::new(37.7749, -122.4194)?;

    index.set_location("bus-12", Location::new(37.7790, -122.4180)?).await?;
    index.set_location("bus-40", Location::new(37.8044, -122.2712)?).await?;
    println!("Stored 2 buses\n");

    let mut query = index.query_at(downtown, Distance::kilometers(1.0))?;
    let mut events = query.events().ok_or("event stream already taken")?;

    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(QueryEvent::Entered { key, location }) => println!("   + {} at {}", key, location),
                Ok(QueryEvent::Moved { key, location }) => println!("   ~ {} to {}", key, location),
                Ok(QueryEvent::Exited { key }) => println!("   - {}", key),
                Err(e) => println!("   ! query stopped: {}", e),
            }
        }
    });

    println!("1. Buses driving through downtown");
    index.set_location("bus-40", Location::new(37.7760, -122.4170)?).await?;
    index.set_location("bus-12", Location::new(37.7800, -122.4100)?).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    println!("\n2. Widening the circle to 15 km");
    query.set_radius(Distance::kilometers(15.0))?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    println!("\n3. Following the query to Oakland");
    query.set_center(Location::new(37.8044, -122.2712)?)?;
    query.set_radius(Distance::kilometers(2.0))?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    println!("\nInside the circle now: {:?}", query.snapshot().keys().collect::<Vec<_>>());
    println!(
        "Subscriptions started: {}, cancelled: {}",
        query.stats().subscriptions_started(),
        query.stats().subscriptions_cancelled()
    );

    query.cancel().await?;
    printer.await?;
    Ok(())
}
