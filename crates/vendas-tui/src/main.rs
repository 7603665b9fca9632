use anyhow::Result;

mod api;
mod app;
mod handler;
mod tui;
mod ui;

use api::ApiClient;
use app::App;
use tui::AppEvent;

const DEFAULT_API_URL: &str = "http://localhost:3001";

#[tokio::main]
async fn main() -> Result<()> {
    let base_url =
        std::env::var("VENDAS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(ApiClient::new(&base_url));

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if let Some(event) = events.next().await {
            match event {
                AppEvent::Key(key) => handler::handle_key(&mut app, key),
                AppEvent::Tick => {
                    app.tick();
                    app.poll_tasks().await;
                }
                AppEvent::Resize(_, _) => {}
            }
        }
    }

    tui::restore()?;
    Ok(())
}
