// ── Vendor default document ──
//
// The factory-style configuration pushed to an appliance when no control
// template is involved, and the baseline every merge starts from. The only
// per-device part is `rec-channels`, whose folder and file prefixes embed
// the device id.

use serde_json::{Map, Value, json};

use crate::model::SettingsDocument;

/// The default settings document for device `device_id`.
pub fn default_settings(device_id: &str) -> SettingsDocument {
    let mut doc = Map::new();

    general(&mut doc);
    doc.insert("input-source".into(), input_source());
    doc.insert("use-nosignal-file".into(), json!(1));
    doc.insert("nosignal-files".into(), nosignal_files());
    video(&mut doc);
    audio(&mut doc);
    doc.insert("enable-deinterlace".into(), json!(0));
    doc.insert("deinterlace-mode".into(), json!(1));
    doc.insert("3d-output".into(), json!({"enable": 0, "mode": 1}));
    doc.insert("main-stream".into(), encoder_stream(StreamProfile::MAIN));
    doc.insert("sub-stream".into(), encoder_stream(StreamProfile::SUB));
    doc.insert("channel-mask".into(), json!(255));
    doc.insert("audio-stream-count".into(), json!(1));
    doc.insert("audio-streams".into(), audio_streams());
    network(&mut doc);
    doc.insert("stream-server".into(), stream_servers());
    doc.insert("rec-channels".into(), recording_channels(device_id));
    doc.insert("nas".into(), json!([]));
    doc.insert("send-file-cloud".into(), json!([]));
    doc.insert("schedulers".into(), json!([]));
    doc.insert(
        "image".into(),
        json!([{
            "id": 0, "name": "", "type": 1, "path": "/surface-image/image0.png",
            "time": 17_091_101_447_340_797_u64, "cx": 401, "cy": 50
        }]),
    );
    doc.insert(
        "surface".into(),
        json!({"main-surface": 0, "second-surface": 0, "surfaces": []}),
    );
    services(&mut doc);

    SettingsDocument::from_map(doc)
}

/// The identity-bearing part of the default document.
pub fn recording_channels(device_id: &str) -> Value {
    json!([
        {
            "id": 0, "type": 0, "is-use": 1, "stream-index": 0, "mode": 0,
            "dir-name": format!("{device_id}_REC_Folder"),
            "file-prefix": 0,
            "prefix-name": format!("{device_id}_"),
            "file-suffix": 0, "time-unit": 10, "audio": 0
        },
        {
            "id": 1, "type": 1, "is-use": 0, "stream-index": 0, "mode": 0,
            "dir-name": device_id,
            "file-prefix": 0,
            "prefix-name": device_id,
            "file-suffix": 0, "time-unit": 90, "audio": 0
        },
        {
            "id": 2, "type": 2, "is-use": 0, "stream-index": 0, "mode": 0,
            "dir-name": "REC_Folder",
            "file-prefix": 0,
            "prefix-name": "VID",
            "file-suffix": 0, "time-unit": 30, "audio": 0
        }
    ])
}

// ── Sections ─────────────────────────────────────────────────────────

fn general(doc: &mut Map<String, Value>) {
    for (key, value) in [
        ("is-low-latency", 0),
        ("is-auto-send-file", 0),
        ("is-auto-del-file", 0),
        ("is-check-update", 0),
        ("audio-sync-offset", 0),
        ("enable-advanced-pcr", 0),
        ("udp-mtu", 1496),
        ("cloud-num", 2),
        ("enable-ndi-hx3", 0),
        ("enable-4k60-input", 0),
        ("enable-usb-audio-capture", 1),
        ("net-prior", 1),
    ] {
        doc.insert(key.into(), json!(value));
    }
}

fn input_source() -> Value {
    json!({
        "source": 2,
        "mixer": {"input-device": 2, "is-hdmi-top": 0, "type": 0, "location": 2}
    })
}

fn nosignal_files() -> Value {
    json!([
        {"id": 0, "is-use": 0, "is-edit": 0, "file-path": "/no-signal/default0.jpg", "time": 0},
        {"id": 1, "is-use": 0, "is-edit": 0, "file-path": "/no-signal/default1.jpg", "time": 0},
        {
            "id": 2, "is-use": 1, "is-edit": 1, "file-path": "/no-signal/default2.jpg",
            "time": 17_149_641_665_160_202_u64
        }
    ])
}

fn video(doc: &mut Map<String, Value>) {
    let input = json!({"is-color-fmt": 0, "color-fmt": 1, "is-quant-range": 0, "quant-range": 1});
    let output = json!({
        "is-color-fmt": 0, "color-fmt": 3, "is-quant-range": 0, "quant-range": 2,
        "is-sat-range": 0, "sat-range": 2
    });
    let color = json!({"contrast": 100, "brightness": 0, "saturation": 100, "hue": 0});

    doc.insert(
        "video-input-format".into(),
        json!({"hdmi": input.clone(), "sdi": input}),
    );
    doc.insert(
        "video-output-format".into(),
        json!({"hdmi": output.clone(), "sdi": output}),
    );
    doc.insert(
        "video-color".into(),
        json!({"hdmi": color.clone(), "sdi": color}),
    );
}

fn audio(doc: &mut Map<String, Value>) {
    doc.insert(
        "volume".into(),
        json!({
            "is-spi": 1, "spi-gain": 0,
            "is-linein": 1, "linein-gain": 0,
            "is-lineout": 1, "lineout-gain": 0,
            "enable-mic-bias": 0
        }),
    );
    doc.insert(
        "audio-mixer".into(),
        json!({"enable-spi-mix": 0, "enable-lineout-mix": 1}),
    );
}

struct StreamProfile {
    cx: u32,
    cy: u32,
    duration: u32,
    kbps: u32,
    vbr_qp: Option<(u32, u32)>,
    main: bool,
}

impl StreamProfile {
    const MAIN: Self = Self {
        cx: 3840,
        cy: 2160,
        duration: 333_333,
        kbps: 25_600,
        vbr_qp: Some((12, 36)),
        main: true,
    };

    const SUB: Self = Self {
        cx: 1280,
        cy: 720,
        duration: 333_667,
        kbps: 2048,
        vbr_qp: None,
        main: false,
    };
}

fn encoder_stream(profile: StreamProfile) -> Value {
    let (min_qp, max_qp) = profile.vbr_qp.unwrap_or((0, 0));
    let mut stream = Map::new();

    if profile.main {
        stream.insert("is-auto".into(), json!(0));
    } else {
        stream.insert("enable".into(), json!(1));
    }
    for (key, value) in [
        ("codec", 1),
        ("cx", profile.cx),
        ("cy", profile.cy),
        ("duration", profile.duration),
        ("kbps", profile.kbps),
        ("gop", 60),
        ("fourcc", 0),
        ("profile", 0),
        ("cbrstat", 60),
        ("fullrange", 0),
        ("is-vbr", u32::from(profile.vbr_qp.is_some())),
        ("min-vbr-qp", min_qp),
        ("max-vbr-qp", max_qp),
        ("is-time-code-sei", 0),
        ("is-closed-caption-sei", 0),
        ("ar-convert-mode", 2),
        ("rotation", 0),
        ("mirroring", 0),
    ] {
        stream.insert(key.into(), json!(value));
    }
    stream.insert(
        "crop".into(),
        json!({
            "is-use": 0,
            "effect": {"x-offset": 0, "y-offset": 0, "act-w": profile.cx, "act-h": profile.cy},
            "crop": {"x-offset": 0, "y-offset": 0, "act-w": 0, "act-h": 0}
        }),
    );
    Value::Object(stream)
}

fn audio_streams() -> Value {
    let mut stream = Map::new();
    stream.insert("sample-rate".into(), json!(48_000));
    stream.insert("channels".into(), json!(2));
    stream.insert("kbps".into(), json!(192));
    for ch in 0..8 {
        stream.insert(format!("ch{ch}"), json!(ch));
    }
    stream.insert("use-lfe".into(), json!(0));
    Value::Array(vec![Value::Object(stream)])
}

fn network(doc: &mut Map<String, Value>) {
    doc.insert(
        "eth".into(),
        json!({"is-dhcp": 1, "ip": "", "mask": "", "router": "", "dns": ""}),
    );
    doc.insert("enable-station".into(), json!(1));
    doc.insert("wifi".into(), json!([]));
    doc.insert(
        "softap".into(),
        json!({"is-softap": 0, "is-visible": 1, "softap-ssid": "", "softap-passwd": ""}),
    );
    doc.insert(
        "rndis".into(),
        json!({"ip": "192.168.66.1", "mask": "255.255.255.0"}),
    );
}

fn stream_servers() -> Value {
    json!([{
        "id": 0, "type": 121, "name": "SRT Listener", "is-use": 1, "port": 8000,
        "max-connections": 1, "latency": 200, "bandwidth": 25, "net-mode": 0,
        "stream-index": 1, "aes": 0, "aes-word": "", "mtu": 1496, "audio": 0,
        "audio-streams": 1, "is-media-hub": 0
    }])
}

fn services(doc: &mut Map<String, Value>) {
    doc.insert(
        "web".into(),
        json!({
            "is-http": 1, "http-port": 80, "is-https": 0, "https-port": 443,
            "is-cert-valid": 0, "is-cert-key-valid": 0, "theme": 0
        }),
    );
    doc.insert("rec".into(), json!({"is-auto": 0, "trigger-mode": 0}));
    doc.insert(
        "living".into(),
        json!({
            "ts": {"mtu": 1496},
            "hls-push": {"seg-count": 3, "seg-duration": 3},
            "ndi-find": {
                "group-name": "Public", "extra-ips": "",
                "enable-discovery": 0, "discovery-server": ""
            }
        }),
    );
    doc.insert(
        "date-time".into(),
        json!({
            "timezone": "America/Los_Angeles", "is-auto": 1,
            "ntp-server": "0.pool.ntp.org", "ntp-server-backup": "1.pool.ntp.org"
        }),
    );
    doc.insert(
        "lcd-control".into(),
        json!({"no-touch": 0, "page-idx": 1, "no-flip": 0, "duration": 666_667}),
    );
}
