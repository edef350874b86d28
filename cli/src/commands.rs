use anyhow::{Result, bail};
use config::Settings;
use std::future::Future;
use v1_store::{
    CollectionKind, FileSessionStore, Mutation, RecordResult, RecordService, Request,
    Role, Session, SessionStore, User, format_date, hash_password,
};

use crate::Command;

/// Which view a signed-in user lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    Admin,
    Auditor,
    Client,
}

impl Dashboard {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Dashboard::Admin,
            Role::Auditor => Dashboard::Auditor,
            Role::Client => Dashboard::Client,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dashboard::Admin => "admin-dashboard",
            Dashboard::Auditor => "auditor-dashboard",
            Dashboard::Client => "client-dashboard",
        }
    }
}

pub fn setup(settings: &Settings, session: &Session<FileSessionStore>, token: &str) -> Result<()> {
    session.set_token(token)?;
    settings.save().map_err(anyhow::Error::msg)?;

    match settings.require_owner() {
        Ok(owner) => println!("Saved token for {}/{}", owner, settings.repo),
        Err(hint) => println!("Saved token. {}", hint),
    }
    Ok(())
}

pub fn logout<S: SessionStore>(session: &Session<S>) -> Result<()> {
    session.logout()?;
    println!("Signed out");
    Ok(())
}

pub fn whoami<S: SessionStore>(session: &Session<S>) -> Result<()> {
    match session.current_user() {
        Some(user) => println!(
            "{} ({}, {}) since {}",
            user.email,
            user.role,
            Dashboard::for_role(user.role).name(),
            format_date(user.created_at)
        ),
        None => println!("Not signed in"),
    }
    Ok(())
}

/// Run a read-modify-write operation, re-running it on conflict up to `retries` times
pub async fn with_retries<T, F, Fut>(retries: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RecordResult<Mutation<T>>>,
{
    for attempt in 1..=retries + 1 {
        match op().await? {
            Mutation::Applied(value) => return Ok(value),
            Mutation::Conflict => {
                tracing::warn!("Collection changed concurrently (attempt {})", attempt);
            }
        }
    }
    bail!(
        "Collection changed concurrently; gave up after {} attempt(s)",
        retries + 1
    )
}

/// The signed-in user, if their role is one of `allowed`
pub fn require_role<S: SessionStore>(session: &Session<S>, allowed: &[Role]) -> Result<User> {
    let Some(user) = session.current_user() else {
        bail!("Not signed in: run `v1 login <email> <password>`");
    };
    if !allowed.contains(&user.role) {
        bail!("This command is not available to {} accounts", user.role);
    }
    Ok(user)
}

pub fn format_request(request: &Request) -> String {
    let mut line = format!(
        "{}  {:<12} {} ({})  client={}  auditor={}  created {}",
        request.tracking_id,
        request.status,
        request.service,
        request.period,
        request.client_email,
        request.assigned_auditor.as_deref().unwrap_or("-"),
        format_date(request.created_at)
    );
    if let Some(notes) = &request.last_notes {
        line.push_str(&format!("\n    notes: {}", notes));
        if let Some(updated) = request.last_updated {
            line.push_str(&format!(" ({})", format_date(updated)));
        }
    }
    line
}

fn print_requests(requests: &[Request]) {
    if requests.is_empty() {
        println!("No requests");
    }
    for request in requests {
        println!("{}", format_request(request));
    }
}

pub async fn run(
    command: Command,
    service: &RecordService,
    session: &Session<FileSessionStore>,
    retries: u32,
) -> Result<()> {
    match command {
        Command::Init => {
            for kind in CollectionKind::ALL {
                match service.collections().ensure(kind).await? {
                    None => println!("{} collection already exists", kind),
                    Some(outcome) if outcome.is_committed() => println!("Created {} collection", kind),
                    Some(_) => bail!("{} collection was created concurrently", kind),
                }
            }
        }
        Command::Register {
            email,
            password,
            role,
        } => {
            let password_hash = hash_password(&password);
            let user = with_retries(retries, || {
                service.register_user(&email, &password_hash, role)
            })
            .await?;
            println!("Registered {} as {}", user.email, user.role);
        }
        Command::Login { email, password } => {
            let Some(user) = service.authenticate_user(&email, &password).await? else {
                bail!("Invalid email or password");
            };
            session.set_current_user(&user)?;
            println!(
                "Signed in as {} ({})",
                user.email,
                Dashboard::for_role(user.role).name()
            );
        }
        Command::Submit {
            service: service_name,
            period,
            description,
        } => {
            let user = require_role(session, &[Role::Client])?;
            let request = with_retries(retries, || {
                service.add_request(&user.email, &service_name, &period, &description)
            })
            .await?;
            println!("Submitted {}", request.tracking_id);
        }
        Command::Requests => {
            let user = require_role(session, &[Role::Admin, Role::Auditor, Role::Client])?;
            let requests = match Dashboard::for_role(user.role) {
                Dashboard::Admin => service.list_requests().await?,
                Dashboard::Auditor => service.get_auditor_requests(&user.email).await?,
                Dashboard::Client => service.get_client_requests(&user.email).await?,
            };
            print_requests(&requests);
        }
        Command::UpdateStatus {
            tracking_id,
            status,
            notes,
        } => {
            require_role(session, &[Role::Admin, Role::Auditor])?;
            let request = with_retries(retries, || {
                service.update_request_status(&tracking_id, status.as_str(), notes.as_deref())
            })
            .await?;
            println!("{}", format_request(&request));
        }
        Command::Assign {
            tracking_id,
            auditor,
        } => {
            require_role(session, &[Role::Admin])?;
            let request =
                with_retries(retries, || service.assign_auditor(&tracking_id, &auditor)).await?;
            println!("{}", format_request(&request));
        }
        Command::Users => {
            require_role(session, &[Role::Admin])?;
            for user in service.list_users().await? {
                println!(
                    "{:<32} {:<8} since {}",
                    user.email,
                    user.role,
                    format_date(user.created_at)
                );
            }
        }
        Command::Setup { .. } | Command::Logout | Command::Whoami => {
            unreachable!("handled before connecting")
        }
    }
    Ok(())
}
