use passgate::client::{ApiClient, ClientError, Operation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_URL: &str = "http://localhost:8000";

fn session(username: &str, password: &str) -> Vec<Operation> {
    vec![
        Operation::Login {
            username: username.into(),
            password: password.into(),
        },
        Operation::Protected,
        Operation::Me,
        Operation::ListPosts,
        Operation::CreatePost {
            title: format!("Hello from {username}"),
            content: "Written by the passgate demo client".into(),
        },
        Operation::GetPost(1),
        Operation::AdminTokens,
        Operation::Logout,
        Operation::Protected,
    ]
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("PASSGATE_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let url = std::env::var("PASSGATE_URL").unwrap_or_else(|_| DEFAULT_URL.into());

    let mut client = match ApiClient::new(&url) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{:?}", e);
            std::process::exit(1);
        }
    };

    let accounts = [("student", "password123"), ("teacher", "secret456")];

    for (username, password) in accounts {
        for operation in session(username, password) {
            match client.perform(&operation).await {
                Ok(summary) => tracing::info!(operation = operation.name(), "{summary}"),
                Err(ClientError::HTTPClient(e)) if e.is_connect() => {
                    tracing::error!("could not reach {url}, is the server running?");
                    std::process::exit(1);
                }
                Err(e) => tracing::warn!(operation = operation.name(), "{e}"),
            }
        }
    }
}
