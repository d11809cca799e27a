use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::config::{self, SavedSession};
use crate::cli::utils::{output_success, output_value};
use crate::cli::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Create an account and start a session")]
    Register {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password")]
        password: String,
        #[arg(long, help = "Full name")]
        full_name: String,
        #[arg(long, help = "Phone number")]
        phone: Option<String>,
        #[arg(long, help = "Role (merchant or customer)")]
        role: Option<String>,
        #[arg(long, help = "Business name (merchants)")]
        business_name: Option<String>,
        #[arg(long, help = "WhatsApp number (merchants)")]
        whatsapp_number: Option<String>,
        #[arg(long, help = "City")]
        city: Option<String>,
    },

    #[command(about = "Login and save the session token")]
    Login {
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password")]
        password: String,
    },

    #[command(about = "Show the authenticated user")]
    Me,

    #[command(about = "End the session and forget the saved token")]
    Logout,

    #[command(about = "Show the saved session")]
    Status,
}

fn save(ctx: &Context, data: &Value, email: &str) -> anyhow::Result<()> {
    let token = data["token"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("Response did not include a session token"))?;
    let session = SavedSession::new(
        &ctx.base_url,
        token.to_string(),
        Some(email.to_string()),
        data["expires_at"].as_str().map(str::to_string),
    );
    config::save_session(&session)
}

fn without_token(mut data: Value) -> Value {
    if let Some(map) = data.as_object_mut() {
        map.remove("token");
    }
    data
}

pub async fn handle(cmd: AuthCommands, ctx: &Context) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Register { email, password, full_name, phone, role, business_name, whatsapp_number, city } => {
            let mut client = ctx.client()?;
            let mut body = json!({
                "email": email,
                "password": password,
                "full_name": full_name,
            });
            for (key, value) in [
                ("phone", phone),
                ("role", role),
                ("business_name", business_name),
                ("whatsapp_number", whatsapp_number),
                ("city", city),
            ] {
                if let Some(value) = value {
                    body[key] = json!(value);
                }
            }

            let data = client.register(&body).await?;
            save(ctx, &data, &email)?;
            output_success(&ctx.output, &format!("Registered {}", email), Some(without_token(data)))
        }
        AuthCommands::Login { email, password } => {
            let mut client = ctx.client()?;
            let data = client.login(&email, &password).await?;
            save(ctx, &data, &email)?;
            output_success(&ctx.output, &format!("Logged in as {}", email), Some(without_token(data)))
        }
        AuthCommands::Me => {
            let data = ctx.client()?.me().await?;
            output_value(&ctx.output, &data)
        }
        AuthCommands::Logout => {
            let mut client = ctx.client()?;
            let result = client.logout().await;
            config::clear_session()?;
            if let Err(e) = result {
                tracing::debug!("Server logout failed: {}", e);
            }
            output_success(&ctx.output, "Logged out", None)
        }
        AuthCommands::Status => match config::load_session()? {
            Some(session) => {
                let details = json!({
                    "url": session.url,
                    "email": session.email,
                    "expires_at": session.expires_at,
                    "saved_at": session.saved_at,
                });
                match ctx.output {
                    OutputFormat::Json => output_value(&ctx.output, &details),
                    OutputFormat::Text => {
                        println!("Logged in as {}", session.email.as_deref().unwrap_or("(unknown)"));
                        println!("URL: {}", session.url);
                        if let Some(expires_at) = &session.expires_at {
                            println!("Expires: {}", expires_at);
                        }
                        Ok(())
                    }
                }
            }
            None => match ctx.output {
                OutputFormat::Json => output_value(&ctx.output, &json!({ "session": null })),
                OutputFormat::Text => {
                    println!("Not logged in");
                    Ok(())
                }
            },
        },
    }
}
