use std::io::Write;

use assert_cmd::Command;

fn imgurl() -> Command {
    Command::cargo_bin("imgurl").expect("binary")
}

#[test]
fn renders_parameters_and_path() {
    imgurl()
        .args([
            "http://localhost:8084/img",
            "--path",
            "lenna.png",
            "-p",
            "s=w320",
            "-p",
            "e=AE",
            "-p",
            "bg=fcfcfc",
            "-p",
            "c=t10",
            "-p",
            "s=h200",
        ])
        .assert()
        .success()
        .stdout("http://localhost:8084/img/s=h200/e=ae/bg=fcfcfc/c=t10/lenna.png\n");
}

#[test]
fn rotates_over_shards() {
    imgurl()
        .args([
            "http://a.example/img",
            "http://b.example/img",
            "--path",
            "x.png",
            "-n",
            "3",
        ])
        .assert()
        .success()
        .stdout("http://a.example/img/x.png\nhttp://b.example/img/x.png\nhttp://a.example/img/x.png\n");
}

#[test]
fn encodes_query_with_selected_charset() {
    imgurl()
        .args([
            "/img",
            "--path",
            "lenna.png?",
            "-p",
            "s=w200",
            "--query",
            "foo=öäü",
            "-e",
            "ISO-8859-1",
            "--uri",
        ])
        .assert()
        .success()
        .stdout("/img/s=w200/lenna.png?foo=%F6%E4%FC\n");
}

#[test]
fn reads_json_config() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{
            "endpoint": "https://localhost:8084/",
            "image_path": "lenna.png",
            "image_params": [
                {{ "name": "s", "value": "w320" }},
                {{ "name": "s", "value": "dpr3.5" }},
                {{ "name": "e", "value": "AE" }}
            ],
            "query_params": [{{ "name": "foo", "value": "bar" }}]
        }}"#
    )
    .expect("write config");

    imgurl()
        .arg("--config")
        .arg(file.path())
        .args(["-j", "e=gl"])
        .assert()
        .success()
        .stdout("https://localhost:8084/s=w320,dpr3.5/e=ae,gl/lenna.png?foo=bar\n");
}

#[test]
fn rejects_reserved_parameter() {
    imgurl()
        .args(["http://localhost:8084/img", "-p", "I=lenna.jpg"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn rejects_empty_endpoint() {
    imgurl().arg("").assert().failure().code(1);
}
