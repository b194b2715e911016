use dungyzon_common::{
    ProductDetails, SearchResultItem, discount_percent, star_breakdown, truncate_title,
};
use dungyzon_frontend::api::{ApiClient, ProductApi, SearchApi};
use dungyzon_frontend::command::{Command, HELP};
use dungyzon_frontend::config;
use dungyzon_frontend::logging;
use dungyzon_frontend::search::{SearchDataController, SearchSnapshot};
use dungyzon_frontend::storage::{JsonFileStore, KeyValueStore, MemoryStore, Preferences};

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const TITLE_WIDTH: usize = 60;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::read_config()?;
    let _logging_guard = logging::init_logging(&config.log_dir, "dungyzon", &config.log_level)?;

    tracing::info!("Dungyzon front-end starting ({:?} mode, API at {})", config.mode, config.base_url());

    let client = Arc::new(ApiClient::new(config.base_url(), config.request_timeout())?);

    let store: Arc<dyn KeyValueStore> = match JsonFileStore::open(&config.storage_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!("Storage at {} unavailable ({}), using memory only", config.storage_path, e);
            Arc::new(MemoryStore::new())
        }
    };
    let prefs = Preferences::new(store);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let initial_query = if args.is_empty() {
        prefs.last_search().unwrap_or_default()
    } else {
        args.join(" ")
    };
    if !initial_query.is_empty() {
        prefs.record_search(&initial_query);
        prefs.set_last_search(&initial_query);
    }

    let search_api: Arc<dyn SearchApi> = client.clone();
    let controller = SearchDataController::new(search_api, initial_query, 1, config.controller_options());
    let max_retries = controller.options().max_retries;

    let mut updates = controller.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            render_snapshot(&snapshot, max_retries);
        }
    });

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received.");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{} (type /help)", e);
                continue;
            }
        };

        match command {
            Command::Search(term) => {
                if !term.is_empty() {
                    prefs.record_search(&term);
                    prefs.set_last_search(&term);
                }
                controller.set_query(&term);
            }
            Command::Page(page) => controller.set_current_page(page),
            Command::Next => {
                let snapshot = controller.snapshot();
                if snapshot.has_more() {
                    controller.set_current_page(snapshot.current_page + 1);
                } else {
                    println!("No more pages.");
                }
            }
            Command::Prev => {
                let snapshot = controller.snapshot();
                if snapshot.current_page > 1 {
                    controller.set_current_page(snapshot.current_page - 1);
                } else {
                    println!("Already on the first page.");
                }
            }
            Command::Retry => controller.refetch(),
            Command::Details(n) => show_details(&client, &controller, n, false).await,
            Command::Quick(n) => show_details(&client, &controller, n, true).await,
            Command::Favorite(n) => match visible_item(&controller, n) {
                Some(item) => match prefs.toggle_favorite(&item) {
                    Some(true) => println!("Added to favorites: {}", truncate_title(item.name(), TITLE_WIDTH)),
                    Some(false) => println!("Removed from favorites: {}", truncate_title(item.name(), TITLE_WIDTH)),
                    None => println!("Result #{} has no product id", n),
                },
                None => println!("No result #{}", n),
            },
            Command::Favorites => {
                let favorites = prefs.favorites();
                if favorites.is_empty() {
                    println!("No favorites yet.");
                }
                for fav in favorites {
                    println!(
                        "  {}  {}  {}  (added {})",
                        fav.id,
                        truncate_title(fav.name.as_deref(), TITLE_WIDTH),
                        fav.price.as_deref().unwrap_or("-"),
                        fav.added_at.format("%Y-%m-%d")
                    );
                }
            }
            Command::History => {
                for (idx, term) in prefs.search_history().iter().enumerate() {
                    println!("  {:>2}. {}", idx + 1, term);
                }
            }
            Command::Theme => {
                let dark = prefs.toggle_dark_mode();
                println!("Dark mode {}", if dark { "on" } else { "off" });
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
        }
    }

    controller.dispose();
    tracing::info!("Dungyzon front-end stopped.");
    Ok(())
}

fn visible_item(controller: &SearchDataController, n: usize) -> Option<SearchResultItem> {
    controller.snapshot().search_results.get(n.checked_sub(1)?).cloned()
}

async fn show_details(client: &ApiClient, controller: &SearchDataController, n: usize, quick: bool) {
    let Some(item) = visible_item(controller, n) else {
        println!("No result #{}", n);
        return;
    };
    let Some(asin) = item.asin() else {
        println!("Result #{} has no product id", n);
        return;
    };

    println!("Loading product details...");
    let details = if quick {
        client.quick_product(asin).await
    } else {
        client.product_details(asin).await
    };
    match details {
        Ok(details) => render_details(&item, &details),
        Err(e) => {
            tracing::error!("Error fetching product details for {}: {}", asin, e);
            println!("Failed to fetch product details: {}", e);
        }
    }
}

fn stars(rating: f64) -> String {
    star_breakdown(rating).iter().map(|s| s.symbol()).collect()
}

fn render_snapshot(snapshot: &SearchSnapshot, max_retries: u32) {
    if snapshot.is_loading {
        println!("Loading '{}' page {}...", snapshot.query, snapshot.current_page);
        return;
    }

    if let Some(error) = &snapshot.error {
        if !snapshot.retries_exhausted() {
            println!("Request failed: {}. Retrying ({}/{})...", error, snapshot.retry_count, max_retries);
        } else {
            println!("Please try at a later time: {}. Type /retry to try again.", error);
        }
        return;
    }

    if !snapshot.has_active_query() {
        return;
    }
    if snapshot.search_results.is_empty() {
        println!("No results for '{}'.", snapshot.query);
        return;
    }

    println!();
    for (idx, item) in snapshot.search_results.iter().enumerate() {
        let mut badges = Vec::new();
        if item.is_best_seller() {
            badges.push("Best Seller");
        }
        if item.has_prime() {
            badges.push("Prime");
        }
        if item.is_amazon_choice() {
            badges.push("Amazon's Choice");
        }
        if item.is_limited_deal() {
            badges.push("Limited Deal");
        }

        let price = item.price_string().unwrap_or("Price not available");
        let discount = item
            .original_price_string()
            .and_then(|original| discount_percent(original, price))
            .map(|pct| format!(" (-{}%)", pct))
            .unwrap_or_default();

        println!(
            "{:>3}. {}\n     {}{}  {} ({})  {}",
            idx + 1,
            truncate_title(item.name(), TITLE_WIDTH),
            price,
            discount,
            stars(item.stars().unwrap_or(0.0)),
            item.stars().unwrap_or(0.0),
            badges.join(" · ")
        );
    }

    let pagination = &snapshot.pagination;
    println!(
        "Page {} of {}{} · {} result(s){}",
        snapshot.current_page,
        pagination.total_pages,
        if snapshot.has_more() { "+" } else { "" },
        pagination.total,
        if snapshot.has_more() { " · /next for more" } else { "" }
    );
}

fn render_details(item: &SearchResultItem, details: &ProductDetails) {
    let Some(info) = &details.details else {
        println!("No product details found");
        return;
    };

    println!();
    println!("{}", info.name.as_deref().or(item.name()).unwrap_or("Unknown Product"));

    let price = info.pricing.as_deref().or(item.price_string()).unwrap_or("-");
    match info.original_price.as_deref() {
        Some(original) => match discount_percent(original, price) {
            Some(pct) => println!("Price: {} (was {}, save {}%)", price, original, pct),
            None => println!("Price: {} (was {})", price, original),
        },
        None => println!("Price: {}", price),
    }
    if let Some(shipping) = &info.shipping_price {
        match &info.shipping_time {
            Some(time) => println!("Shipping: {}, arrives {}", shipping, time),
            None => println!("Shipping: {}", shipping),
        }
    }
    if let Some(status) = &info.availability_status {
        println!("Availability: {}", status);
    }

    let rating = info.average_rating.or(item.stars()).unwrap_or(0.0);
    let ratings = info.total_ratings.or(item.total_reviews()).unwrap_or(0);
    println!("Rating: {} {} ({} ratings)", stars(rating), rating, ratings);
    for (star, pct) in info.star_percentages() {
        println!("  {} star  {:<20} {}%", star, "#".repeat((pct / 5.0).round() as usize), pct);
    }
    if info.is_coupon_exists {
        println!("Coupon available");
    }

    if let Some(description) = &info.full_description {
        println!("\n{}", description);
    }
    for bullet in &info.feature_bullets {
        println!("  • {}", bullet);
    }
    if let Some(product_info) = &info.product_information {
        for (key, value) in product_info {
            let value = value.as_str().map(String::from).unwrap_or_else(|| value.to_string());
            println!("  {}: {}", key, value);
        }
    }
    if let Some(insights) = &info.customers_say {
        println!("\nWhat Customers Say:");
        if let Some(summary) = &insights.summary {
            println!("  {}", summary);
        }
        for (category, count) in &insights.select_to_learn_more {
            match count.positive_percent() {
                Some(pct) => println!("  {}: {}/{} positive ({}%)", category, count.positive, count.total, pct),
                None => println!("  {}: no feedback", category),
            }
        }
    }
    if !info.images.is_empty() {
        println!("Images: {}", info.images.len());
    }

    let reviews = details.reviews_to_show();
    if !reviews.is_empty() {
        println!("\nReviews:");
    }
    for review in reviews {
        println!(
            "  {} {}  {}",
            stars(review.stars.unwrap_or(0.0)),
            review.display_title(),
            review.formatted_date()
        );
        if let Some(text) = &review.review {
            println!("    {}", text);
        }
        println!(
            "    By {}{}",
            review.author(),
            if review.verified_purchase { " · Verified Purchase" } else { "" }
        );
    }
    if let Some(url) = item.url() {
        println!("\n{}", url);
    }
}
