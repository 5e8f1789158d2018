use stashq::app::startup::startup;

#[tokio::main]
async fn main() {
    startup().await;
}
