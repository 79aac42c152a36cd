use crate::protocol::DEFAULT_PORT;
use crate::{Error, Result};
use url::Url;

/// Where a push goes, split the way the remote server expects it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    /// `rtmps` target
    pub secure: bool,
    pub host: String,
    pub port: u16,

    /// Application, including any query string of the target URL
    pub app: String,

    /// Stream name on the remote server
    pub stream_out: String,

    pub tc_url: String,
}

impl PushTarget {
    /// Parse `rtmp[s]://host[:port]/app[/stream][?query]`. The path up to
    /// the first `/` is the application; the rest is the remote stream name,
    /// or `fallback_stream` when there is none.
    pub fn parse(target: &str, fallback_stream: &str) -> Result<Self> {
        let url = Url::parse(target)?;
        let secure = match url.scheme() {
            "rtmp" => false,
            "rtmps" => true,
            scheme => {
                return Err(Error::config(format!("Unsupported push scheme: {}", scheme)));
            }
        };

        let host = url
            .host_str()
            .ok_or_else(|| Error::config(format!("Missing host in {}", target)))?
            .to_string();
        let port = url.port().unwrap_or(DEFAULT_PORT);

        let mut path = url.path().strip_prefix('/').unwrap_or(url.path()).to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        let (app, stream_out) = match path.split_once('/') {
            Some((app, stream)) => (app.to_string(), stream.to_string()),
            None => (path, String::new()),
        };
        let stream_out = if stream_out.is_empty() {
            fallback_stream.to_string()
        } else {
            stream_out
        };

        let tc_url = if port == DEFAULT_PORT {
            format!("rtmp://{}/{}", host, app)
        } else {
            format!("rtmp://{}:{}/{}", host, port, app)
        };

        Ok(PushTarget {
            secure,
            host,
            port,
            app,
            stream_out,
            tc_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_and_stream() {
        let target = PushTarget::parse("rtmp://ingest.example.com/live2/abcd-1234", "local").unwrap();
        assert!(!target.secure);
        assert_eq!(target.port, 1935);
        assert_eq!(target.app, "live2");
        assert_eq!(target.stream_out, "abcd-1234");
        assert_eq!(target.tc_url, "rtmp://ingest.example.com/live2");
    }

    #[test]
    fn test_port_query_and_fallback() {
        let target = PushTarget::parse("rtmps://example.com:4443/app?token=x", "local").unwrap();
        assert!(target.secure);
        assert_eq!(target.app, "app?token=x");
        assert_eq!(target.stream_out, "local");
        assert_eq!(target.tc_url, "rtmp://example.com:4443/app?token=x");

        let target = PushTarget::parse("rtmp://example.com/app/sub/stream?k=v", "local").unwrap();
        assert_eq!(target.app, "app");
        assert_eq!(target.stream_out, "sub/stream?k=v");
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            PushTarget::parse("http://example.com/app/s", "x"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(PushTarget::parse("not a url", "x"), Err(Error::Url(_))));
    }
}
