use clap::{Args, Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

use cabinet_gateway::security::signer::RequestSigner;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Sign and send requests to the Cabinet gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign (and optionally encrypt) a request, send it, print the response
    Send {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,

        #[command(flatten)]
        request: RequestArgs,
    },
    /// Print the protocol headers for a request without sending it
    Sign {
        #[command(flatten)]
        request: RequestArgs,
    },
}

#[derive(Args)]
struct RequestArgs {
    #[arg(short = 'X', long, default_value = "POST")]
    method: String,

    /// Path including any query string
    #[arg(short, long, default_value = "/security/echo")]
    path: String,

    /// Actor reference, `user:<id>` or `integration:<id>`
    #[arg(short, long)]
    actor: String,

    #[arg(short, long)]
    kid: String,

    #[arg(short, long, env = "GATEWAY_SECRET")]
    secret: String,

    #[arg(short, long, default_value = "{}")]
    body: String,

    /// Seal the body into an encrypted envelope
    #[arg(short, long)]
    encrypt: bool,

    /// Defaults to a random 32-char hex nonce
    #[arg(long)]
    nonce: Option<String>,

    /// Defaults to a random trace id
    #[arg(long)]
    trace: Option<String>,
}

struct Prepared {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Vec<u8>,
}

fn prepare(args: &RequestArgs) -> Result<Prepared, Box<dyn std::error::Error>> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())?;
    let nonce = args
        .nonce
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let trace = args
        .trace
        .clone()
        .unwrap_or_else(|| format!("cli-{}", Uuid::new_v4().simple()));

    let signer = RequestSigner {
        actor: &args.actor,
        key_id: &args.kid,
        secret: &args.secret,
    };
    let signed = signer
        .sign(method.as_str(), &args.path, args.body.as_bytes(), &nonce, &trace, args.encrypt)
        .ok_or("failed to encrypt request body")?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in signed.headers {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_str(&value)?);
    }

    Ok(Prepared {
        method,
        path: args.path.clone(),
        headers,
        body: signed.body,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Send { url, request } => {
            let prepared = prepare(&request)?;
            let client = reqwest::Client::new();
            let res = client
                .request(prepared.method, format!("{}{}", url.trim_end_matches('/'), prepared.path))
                .headers(prepared.headers)
                .body(prepared.body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Sign { request } => {
            let prepared = prepare(&request)?;
            println!("{} {}", prepared.method, prepared.path);
            for (name, value) in &prepared.headers {
                println!("{}: {}", name, value.to_str().unwrap_or_default());
            }
            println!();
            println!("{}", String::from_utf8_lossy(&prepared.body));
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(request_id) = res.headers().get("x-request-id") {
        eprintln!("x-request-id: {}", request_id.to_str().unwrap_or_default());
    }

    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
