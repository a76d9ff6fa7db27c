use log::{error, warn};
use openssl::ssl::{SslConnector, SslMethod};
use postgres_openssl::MakeTlsConnector;
use std::future::Future;
use tokio::time::Duration;
use tokio_postgres::{Client, NoTls};
use url::Url;

const WAIT_BETWEEN_RETRIES: u64 = 1;

/// TLS connector trusting the CA certificate at `ca_path`
pub fn create_ssl_connector(ca_path: &str) -> Result<MakeTlsConnector, String> {
    let mut builder =
        SslConnector::builder(SslMethod::tls()).map_err(|e| format!("SSL builder error: {}", e))?;
    builder
        .set_ca_file(ca_path)
        .map_err(|e| format!("Error loading CA cert {}: {}", ca_path, e))?;
    Ok(MakeTlsConnector::new(builder.build()))
}

/// Split the `sslrootcert` parameter out of a connection URL.
///
/// The PostgreSQL client rejects unknown parameters, so the certificate
/// path is removed from the query string and returned separately.
pub fn split_sslrootcert(database_url: &str) -> Result<(String, Option<String>), String> {
    let url = Url::parse(database_url).map_err(|e| format!("URL parse error: {}", e))?;

    let mut sslrootcert_path = None;
    let mut clean_params = Vec::new();
    for (key, value) in url.query_pairs() {
        if key == "sslrootcert" {
            sslrootcert_path = Some(value.to_string());
        } else {
            clean_params.push((key.into_owned(), value.into_owned()));
        }
    }

    let mut clean_url = url.clone();
    clean_url.set_query(None);
    if !clean_params.is_empty() {
        let query = clean_params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        clean_url.set_query(Some(&query));
    }

    Ok((clean_url.to_string(), sslrootcert_path))
}

async fn connect(database_url: &str) -> Result<Client, String> {
    let (clean_database_url, sslrootcert_path) = split_sslrootcert(database_url)?;

    let client = match sslrootcert_path {
        Some(path) => {
            let connector = create_ssl_connector(&path)?;
            let (client, connection) = tokio_postgres::connect(&clean_database_url, connector)
                .await
                .map_err(|e| format!("Connection error: {}", e))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("Connection error: {}", e);
                }
            });
            client
        }
        None => {
            let (client, connection) = tokio_postgres::connect(&clean_database_url, NoTls)
                .await
                .map_err(|e| format!("Connection error: {}", e))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("Connection error: {}", e);
                }
            });
            client
        }
    };

    Ok(client)
}

/// Run `attempt` until it succeeds, at most `max_attempts` times, with
/// `pause` between failed attempts. Attempts are numbered from 1.
pub async fn retry<F, Fut, T>(
    max_attempts: usize,
    pause: Duration,
    mut attempt: F,
) -> Result<T, String>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut last_error = String::from("No attempts made");

    for number in 1..=max_attempts {
        match attempt(number).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("Attempt {}: {}", number, e);
                last_error = e;
            }
        }

        if number < max_attempts {
            tokio::time::sleep(pause).await;
        }
    }

    Err(format!(
        "Max retries exceeded after {} attempts: {}",
        max_attempts, last_error
    ))
}

/// Connect and run `operation`, retrying on failure up to `max_attempts`
/// times with a fixed pause in between. Returns on the first success.
pub async fn execute_with_retry<F, Fut, T>(
    database_url: &str,
    max_attempts: usize,
    operation: F,
) -> Result<T, String>
where
    F: Fn(Client) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, tokio_postgres::Error>> + Send,
{
    let operation = &operation;
    retry(
        max_attempts,
        Duration::from_secs(WAIT_BETWEEN_RETRIES),
        move |_| async move {
            let client = connect(database_url).await?;
            operation(client)
                .await
                .map_err(|e| format!("Query error: {}", e))
        },
    )
    .await
}
