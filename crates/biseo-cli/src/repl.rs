//! Interactive terminal session.
//!
//! Buttons from the last reply are pressed with `/N`.  Forms are filled in
//! field by field; an empty answer keeps the pre-filled value.

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result};
use biseo_intent::{Assistant, Button, FailureKind, Form, InboundMessage, Outcome, Reply};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use crate::config::AppConfig;
use crate::helpers::{App, build_app};

type Input = Lines<BufReader<Stdin>>;

pub async fn run(config: &AppConfig, user: &str, offline: bool) -> Result<()> {
    let App {
        assistant,
        context,
        wiring,
    } = build_app(config, offline)?;
    let sweeper = assistant.sessions().spawn_sweeper(config.sweep_interval());

    println!();
    println!("  biseo v{}", env!("CARGO_PKG_VERSION"));
    println!("  Backend: {}", wiring.backend);
    println!("  Model:   {}", wiring.model.as_deref().unwrap_or("none (keyword rules only)"));
    println!("  User:    {user}");
    println!("  /N presses button N, /image <설명> remembers an image, 'quit' exits.");
    println!();

    let mut input: Input = BufReader::new(tokio::io::stdin()).lines();
    let mut buttons: Vec<Button> = Vec::new();

    loop {
        prompt("> ");
        let Some(line) = input.next_line().await.context("failed to read input")? else {
            println!();
            info!("EOF received, exiting");
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "quit" || trimmed == "exit" {
            break;
        }

        if let Some(description) = trimmed.strip_prefix("/image") {
            context.remember_image(user, description.trim());
            println!("  이미지를 기억했습니다.\n");
            continue;
        }

        let reply = if let Some(number) = trimmed.strip_prefix('/') {
            let Some(button) = number
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| buttons.get(i))
            else {
                println!("  그런 버튼이 없습니다.\n");
                continue;
            };
            println!("  [{}]", button.label);
            assistant
                .dispatcher()
                .on_button_activated(user, &button.callback_id)
                .await
        } else {
            let response = assistant
                .handle_message(&InboundMessage::new(user, trimmed))
                .await;
            match response.reply {
                Some(reply) => {
                    context.record_turn(user, trimmed, &reply.message);
                    reply
                }
                None => {
                    println!(
                        "  ({} 요청은 이 터미널에서 처리하지 않습니다.)\n",
                        response.classification.category()
                    );
                    continue;
                }
            }
        };

        let reply = settle_forms(&assistant, user, reply, &mut input).await?;
        render(&reply);
        buttons = reply.buttons().cloned().collect();
    }

    sweeper.abort();
    info!("shutting down");
    Ok(())
}

/// Keep filling forms until a reply without one comes back.
async fn settle_forms(
    assistant: &Assistant,
    user: &str,
    mut reply: Reply,
    input: &mut Input,
) -> Result<Reply> {
    while let Some(form) = reply.form().cloned() {
        render(&reply);
        let Some(fields) = fill(&form, input).await? else {
            return Ok(Reply::success("수정을 그만두었습니다."));
        };
        reply = assistant
            .dispatcher()
            .on_form_submitted(user, &form.callback_id, &fields)
            .await;
        if reply.failure_kind() == Some(FailureKind::Validation) {
            render(&reply);
            reply = Reply::success("").with_form(form);
        }
    }
    Ok(reply)
}

/// Ask for each field.  `None` when input ends or the user types `cancel`.
async fn fill(form: &Form, input: &mut Input) -> Result<Option<HashMap<String, String>>> {
    let mut fields = HashMap::new();
    for field in &form.fields {
        prompt(&format!("  {} [{}]: ", field.label, field.value));
        let Some(line) = input.next_line().await.context("failed to read input")? else {
            return Ok(None);
        };
        let answer = line.trim();
        if answer == "cancel" {
            return Ok(None);
        }
        let value = if answer.is_empty() {
            field.value.clone()
        } else if answer == "-" {
            String::new()
        } else {
            answer.to_string()
        };
        fields.insert(field.name.clone(), value);
    }
    Ok(Some(fields))
}

fn prompt(text: &str) {
    print!("{text}");
    std::io::stdout().flush().ok();
}

fn render(reply: &Reply) {
    if !reply.message.is_empty() {
        match reply.outcome {
            Outcome::Success => println!("{}", reply.message),
            Outcome::Failure(_) => println!("! {}", reply.message),
        }
    }
    for (i, button) in reply.buttons().enumerate() {
        println!("  /{} {}", i + 1, button.label);
    }
    if let Some(form) = reply.form() {
        println!("  [{}] Enter 는 현재 값 유지, '-' 는 비우기, 'cancel' 은 취소", form.title);
    }
    println!();
}
