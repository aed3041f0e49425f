#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    demand_bundle_server::run().await
}
