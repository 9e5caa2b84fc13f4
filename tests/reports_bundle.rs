use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_reportd");
    let mut child = Command::new(exe)
        .env_remove("REPORTD_CONFIG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn reportd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .cloned()
            .unwrap_or_else(|| json!({ "message": "unknown" }))
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn bundle_carries_both_artifacts_and_a_checked_manifest() {
    let out_dir = temp_dir("reportd-bundle");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "reports.exportBundle",
        json!({
            "subjects": [{ "subjectName": "Math" }, { "subjectName": "Science" }],
            "records": [{
                "admissionNumber": "A001",
                "name": "J.Doe",
                "averageOfMarks": 76.555,
                "position": 1,
                "marks": [{ "Math": 80 }]
            }],
            "metadata": { "title": "Grade 10 A Report!", "termLabel": "Term 1" },
            "outDir": out_dir.to_string_lossy()
        }),
    );
    assert_eq!(result["fileName"], json!("grade-10-a-report-term-1.zip"));
    assert_eq!(result["pageCount"], json!(1));
    assert_eq!(result["sheetCount"], json!(1));

    let path = PathBuf::from(result["path"].as_str().expect("path"));
    let mut archive = zip::ZipArchive::new(File::open(&path).expect("open bundle")).expect("zip");
    let mut manifest_text = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest_text)
        .expect("read manifest");
    let manifest: serde_json::Value = serde_json::from_str(&manifest_text).expect("manifest json");
    assert_eq!(manifest["format"], json!("reportd-export-v1"));
    assert_eq!(manifest["exportId"], result["exportId"]);
    assert_eq!(manifest["exportId"].as_str().map(str::len), Some(36));

    let entries = manifest["entries"].as_array().expect("entries");
    let names: Vec<&str> = entries.iter().filter_map(|e| e["name"].as_str()).collect();
    assert_eq!(names, vec!["grade-10-a-report-term-1.xlsx", "grade-10-a-report-term-1.pdf"]);
    for entry in entries {
        let name = entry["name"].as_str().expect("name");
        let mut bytes = Vec::new();
        archive
            .by_name(name)
            .expect("artifact entry")
            .read_to_end(&mut bytes)
            .expect("read artifact");
        assert_eq!(entry["size"], json!(bytes.len()));
        assert_eq!(entry["sha256"], json!(format!("{:x}", Sha256::digest(&bytes))));
    }

    let verified = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "reports.verifyBundle",
        json!({ "path": path.to_string_lossy() }),
    );
    assert_eq!(verified["valid"], json!(true));

    let foreign = out_dir.join("foreign.zip");
    {
        let mut zip = zip::ZipWriter::new(File::create(&foreign).expect("create"));
        zip.start_file("readme.txt", zip::write::FileOptions::default())
            .expect("start entry");
        zip.write_all(b"not a report bundle").expect("write entry");
        zip.finish().expect("finish zip");
    }
    let rejected = request(
        &mut stdin,
        &mut reader,
        "3",
        "reports.verifyBundle",
        json!({ "path": foreign.to_string_lossy() }),
    );
    assert_eq!(rejected["ok"], json!(false));
    assert_eq!(rejected["error"]["code"], json!("bundle_invalid"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(out_dir);
}
