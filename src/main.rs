#[tokio::main]
async fn main() {
    herald::boot::boot().await;
}
