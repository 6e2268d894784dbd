use anyhow::{Context, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use httpwire::config::{self, AppConfig};
use httpwire::http::cookies::CookieOptions;
use httpwire::http::method::Method;
use httpwire::http::multipart::{FormValue, Post, Upload};
use httpwire::http::request::Request;
use httpwire::http::{ok, serialize_response};
use std::io::Write;
use std::str::FromStr;

fn cli() -> Command {
    Command::new("httpwire")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Renders Set-Cookie headers and multipart/form-data request bodies")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Where can I find my configuration?"),
        )
        .subcommand(
            Command::new("cookies")
                .about("Print the response carrying the Set-Cookie headers")
                .arg(
                    Arg::new("cookie")
                        .long("cookie")
                        .value_name("HEADER")
                        .help("Incoming Cookie header"),
                )
                .arg(
                    Arg::new("set")
                        .long("set")
                        .value_name("NAME=VALUE")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("delete")
                        .long("delete")
                        .value_name("NAME")
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("multipart")
                .about("Print a multipart request built from the given fields")
                .arg(Arg::new("method").long("method").default_value("POST"))
                .arg(Arg::new("url").long("url").default_value("/"))
                .arg(
                    Arg::new("field")
                        .value_name("NAME=VALUE|NAME=@PATH")
                        .action(ArgAction::Append),
                ),
        )
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = cli().get_matches();
    let config = config::load(matches.get_one::<String>("config"))?;

    let output = run(&matches, &config)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&output)?;
    stdout.flush()?;
    Ok(())
}

fn run(matches: &ArgMatches, config: &AppConfig) -> anyhow::Result<Vec<u8>> {
    match matches.subcommand() {
        Some(("cookies", sub)) => cookies(sub, config),
        Some(("multipart", sub)) => multipart(sub),
        _ => bail!("A subcommand is required"),
    }
}

fn split_pair(s: &str) -> anyhow::Result<(&str, &str)> {
    match s.split_once('=') {
        Some(pair) => Ok(pair),
        None => bail!("Expected NAME=VALUE, got: {}", s),
    }
}

fn values<'a>(m: &'a ArgMatches, id: &str) -> impl Iterator<Item = &'a String> {
    m.get_many::<String>(id).into_iter().flatten()
}

fn cookies(m: &ArgMatches, config: &AppConfig) -> anyhow::Result<Vec<u8>> {
    let mut request = Request::new(Method::GET, "/");
    if let Some(header) = m.get_one::<String>("cookie") {
        request = request.with_header("Cookie", header);
    }

    let mut jar = request.cookies(&config.cookies);
    for pair in values(m, "set") {
        let (name, value) = split_pair(pair)?;
        jar.set_value(name, value);
    }
    for name in values(m, "delete") {
        jar.delete(name, CookieOptions::new());
    }

    let mut response = ok();
    response.apply_cookies(&jar, &config.cookies);
    Ok(serialize_response(&response))
}

fn multipart(m: &ArgMatches) -> anyhow::Result<Vec<u8>> {
    let method = m.get_one::<String>("method").map_or("POST", String::as_str);
    let method = Method::from_str(method).with_context(|| format!("Unknown HTTP method {}", method))?;
    let url = m.get_one::<String>("url").map_or("/", String::as_str);

    let mut fields = Vec::new();
    for field in values(m, "field") {
        let (name, value) = split_pair(field)?;
        let value = match value.strip_prefix('@') {
            Some(path) => FormValue::from(
                Upload::open(path).with_context(|| format!("Opening upload {}", path))?,
            ),
            None => FormValue::from(value),
        };
        fields.push((name, value));
    }

    let post = Post::new(fields)?;
    let request = Request::multipart(method, url, &post);

    let mut out = format!("{} {} HTTP/1.1\r\n", request.method, request.url).into_bytes();
    for header in ["Content-Type", "Content-Length"] {
        if let Some(value) = request.get_header(header) {
            out.extend(format!("{}: {}\r\n", header, value).as_bytes());
        }
    }
    out.extend(b"\r\n");
    out.extend(&request.content);
    Ok(out)
}
