use anyhow::Context;
use storefront_assistant::{CheckoutOutcome, SessionSettings, StorefrontSession};
use storefront_core::domain::product::Product;
use storefront_core::nlu::responder::ReplyKind;
use storefront_core::QUICK_REPLIES;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::commands::{build_runtime, load_config, open_stores, render_product, CommandResult};

const PROMPT: &str = "> ";
const USAGE: &str = "commands: search <text> | list | add <id> | cart | checkout | voice | quit\nanything else is sent to the assistant";

#[derive(Debug, Default, PartialEq, Eq)]
struct ShopSummary {
    chat_messages: usize,
    orders: Vec<String>,
}

enum ShopperInput<'a> {
    Search(&'a str),
    List,
    Add(&'a str),
    Cart,
    Checkout,
    Voice,
    Usage,
    Quit,
    Chat(&'a str),
}

fn parse_input(line: &str) -> ShopperInput<'_> {
    let line = line.trim();
    let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match head.to_ascii_lowercase().as_str() {
        "search" => ShopperInput::Search(rest.trim()),
        "list" | "products" if rest.is_empty() => ShopperInput::List,
        "add" if !rest.is_empty() => ShopperInput::Add(rest.trim()),
        "cart" if rest.is_empty() => ShopperInput::Cart,
        "checkout" if rest.is_empty() => ShopperInput::Checkout,
        "voice" if rest.is_empty() => ShopperInput::Voice,
        "?" | "commands" => ShopperInput::Usage,
        "quit" | "exit" if rest.is_empty() => ShopperInput::Quit,
        _ => ShopperInput::Chat(line),
    }
}

/// Interactive session on stdin/stdout. Ends on `quit` or end of input; any
/// pending order progression is cancelled on exit.
pub fn run() -> CommandResult {
    let config = match load_config("shop") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("shop") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let (pool, stores) = open_stores(&config).await?;
        let mut session = StorefrontSession::start(
            stores.products.as_ref(),
            stores.orders.clone(),
            SessionSettings::from(&config.storefront),
        )
        .await;

        let input = tokio::io::BufReader::new(tokio::io::stdin());
        let driven = drive(&mut session, input, tokio::io::stdout(), &config.storefront.currency_symbol)
            .await
            .map_err(|error| ("session_io", format!("{error:#}"), 3u8));

        session.shutdown();
        pool.close().await;
        driven
    });

    match result {
        Ok(summary) => CommandResult::success(
            "shop",
            format!(
                "session ended after {} chat message(s); orders placed: {}",
                summary.chat_messages,
                if summary.orders.is_empty() { "none".to_string() } else { summary.orders.join(", ") }
            ),
        ),
        Err(failure) => CommandResult::from_failure("shop", failure),
    }
}

async fn drive<R, W>(
    session: &mut StorefrontSession,
    input: R,
    mut output: W,
    currency: &str,
) -> anyhow::Result<ShopSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = ShopSummary::default();
    let mut lines = input.lines();

    let mut banner = Vec::new();
    if let Some(opening) = session.transcript().last() {
        banner.push(format!("bot: {}", opening.text));
    }
    banner.push(format!("{} products available. {USAGE}", session.catalog().len()));
    write_block(&mut output, &banner.join("\n")).await?;

    loop {
        output.write_all(PROMPT.as_bytes()).await.context("writing prompt")?;
        output.flush().await.context("flushing prompt")?;

        let Some(line) = lines.next_line().await.context("reading shopper input")? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let block = match parse_input(&line) {
            ShopperInput::Quit => break,
            ShopperInput::Usage => USAGE.to_string(),
            ShopperInput::Search(text) => {
                let results = session.search(text).to_vec();
                render_results(&results, currency)
            }
            ShopperInput::List => render_results(session.results(), currency),
            ShopperInput::Add(raw) => add_by_short_id(session, raw),
            ShopperInput::Cart => render_cart(session, currency),
            ShopperInput::Checkout => match session.checkout().await {
                CheckoutOutcome::Placed { order_id, message } => {
                    summary.orders.push(order_id.to_string());
                    message
                }
                outcome => outcome.message().to_string(),
            },
            ShopperInput::Voice => {
                session.start_voice_capture();
                write_block(&mut output, "🎙 Listening...").await?;
                match session.voice_search().await {
                    Some(results) => {
                        let results = results.to_vec();
                        format!("heard: \"{}\"\n{}", session.query(), render_results(&results, currency))
                    }
                    None => "voice capture was cancelled".to_string(),
                }
            }
            ShopperInput::Chat(text) => match session.send_chat_message(text).await {
                Some(reply) => {
                    summary.chat_messages += 1;
                    if matches!(reply.kind, ReplyKind::Fallback | ReplyKind::Help) {
                        format!("bot: {}\n[{}]", reply.text, QUICK_REPLIES.join("] ["))
                    } else {
                        format!("bot: {}", reply.text)
                    }
                }
                None => continue,
            },
        };
        write_block(&mut output, &block).await?;
    }

    Ok(summary)
}

fn add_by_short_id(session: &mut StorefrontSession, raw: &str) -> String {
    let Some(short_id) = raw.trim_start_matches('#').parse::<u32>().ok() else {
        return format!("`{raw}` is not a product number; try `list`");
    };
    let Some(product_id) = session.catalog().find_by_short_id(short_id).map(|p| p.id.clone()) else {
        return format!("no product with number {short_id}");
    };
    session.add_to_cart(&product_id).unwrap_or_else(|| format!("no product with number {short_id}"))
}

fn render_results(results: &[Product], currency: &str) -> String {
    if results.is_empty() {
        return "No products found.".to_string();
    }
    results.iter().map(|product| render_product(product, currency)).collect::<Vec<_>>().join("\n")
}

fn render_cart(session: &StorefrontSession, currency: &str) -> String {
    let cart = session.cart();
    if cart.is_empty() {
        return "Your cart is empty.".to_string();
    }
    let mut lines = cart
        .items()
        .iter()
        .map(|item| render_product(&item.product, currency))
        .collect::<Vec<_>>();
    lines.push(format!("Total: {currency}{}", cart.total().normalize()));
    lines.join("\n")
}

async fn write_block<W>(output: &mut W, block: &str) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(block.as_bytes()).await.context("writing to terminal")?;
    output.write_all(b"\n").await.context("writing to terminal")?;
    output.flush().await.context("flushing terminal")?;
    Ok(())
}
