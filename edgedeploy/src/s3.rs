use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
  primitives::ByteStream,
  types::{BucketCannedAcl, CompletedMultipartUpload, CompletedPart},
  Client,
};
use tokio::{
  fs::File,
  io::{AsyncRead, AsyncReadExt},
};
use tracing::{debug, error, info};

use crate::{
  config::Settings,
  provider::{ArtifactUploader, BucketStore},
  sdk_error,
};

/// Size of each multipart upload part; also the minimum S3 accepts for all but the last part
pub const PART_SIZE: usize = 5 * 1024 * 1024;

#[async_trait]
impl BucketStore for Client {
  async fn create_bucket(&self, name: &str, acl: &str) -> Result<()> {
    self
      .create_bucket()
      .bucket(name)
      .acl(BucketCannedAcl::from(acl))
      .send()
      .await
      .map_err(sdk_error)?;

    Ok(())
  }
}

/// Uploads small artifacts with a single `PutObject` and anything of at least one part
/// size through a multipart upload
#[async_trait]
impl ArtifactUploader for Client {
  async fn upload(&self, bucket: &str, key: &str, body: &mut (dyn AsyncRead + Send + Unpin)) -> Result<()> {
    let first = read_part(body, PART_SIZE).await?;

    if first.len() < PART_SIZE {
      debug!("Uploading {key} ({} bytes) in a single request", first.len());
      self
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(first))
        .send()
        .await
        .map_err(sdk_error)?;

      return Ok(());
    }

    let created = self
      .create_multipart_upload()
      .bucket(bucket)
      .key(key)
      .send()
      .await
      .map_err(sdk_error)?;
    let upload_id = created.upload_id().context("upload id should exist")?.to_owned();
    debug!("Started multipart upload {upload_id} for {key}");

    match upload_parts(self, bucket, key, &upload_id, first, body).await {
      Ok(parts) => {
        debug!("Completed multipart upload {upload_id} with {parts} parts");
        Ok(())
      }
      Err(err) => {
        abort_upload(self, bucket, key, &upload_id).await;
        Err(err)
      }
    }
  }
}

/// Read up to `size` bytes, returning fewer only at the end of the stream
async fn read_part(body: &mut (dyn AsyncRead + Send + Unpin), size: usize) -> Result<Vec<u8>> {
  let mut buf = Vec::with_capacity(size);
  (&mut *body).take(size as u64).read_to_end(&mut buf).await?;

  Ok(buf)
}

/// Upload `first` and the rest of `body` as parts, then complete the upload
///
/// Returns the number of parts uploaded
async fn upload_parts(
  client: &Client,
  bucket: &str,
  key: &str,
  upload_id: &str,
  first: Vec<u8>,
  body: &mut (dyn AsyncRead + Send + Unpin),
) -> Result<i32> {
  let mut completed = Vec::new();
  let mut part_number = 1;
  let mut chunk = first;

  loop {
    debug!("Uploading part {part_number} ({} bytes) of {key}", chunk.len());
    let part = client
      .upload_part()
      .bucket(bucket)
      .key(key)
      .upload_id(upload_id)
      .part_number(part_number)
      .body(ByteStream::from(chunk))
      .send()
      .await
      .map_err(sdk_error)?;

    completed.push(
      CompletedPart::builder()
        .set_e_tag(part.e_tag().map(str::to_owned))
        .part_number(part_number)
        .build(),
    );

    chunk = read_part(body, PART_SIZE).await?;
    if chunk.is_empty() {
      break;
    }
    part_number += 1;
  }

  client
    .complete_multipart_upload()
    .bucket(bucket)
    .key(key)
    .upload_id(upload_id)
    .multipart_upload(CompletedMultipartUpload::builder().set_parts(Some(completed)).build())
    .send()
    .await
    .map_err(sdk_error)?;

  Ok(part_number)
}

/// Abort a multipart upload so that its parts are not left behind
///
/// Failure to abort is logged; the error that caused the abort is the one reported.
async fn abort_upload(client: &Client, bucket: &str, key: &str, upload_id: &str) {
  error!("Aborting multipart upload {upload_id}");

  if let Err(err) = client
    .abort_multipart_upload()
    .bucket(bucket)
    .key(key)
    .upload_id(upload_id)
    .send()
    .await
  {
    error!("Unable to abort {upload_id}: {}", sdk_error(err));
  }
}

/// Create the origin and source code buckets
pub async fn create_buckets(store: &dyn BucketStore, settings: &Settings) -> Result<()> {
  store
    .create_bucket(&settings.origin_bucket, &settings.bucket_acl)
    .await
    .context("Could not create origin bucket")?;
  info!("Created origin bucket {}", settings.origin_bucket);

  store
    .create_bucket(&settings.source_bucket, &settings.bucket_acl)
    .await
    .context("Could not create source code bucket")?;
  info!("Created source code bucket {}", settings.source_bucket);

  Ok(())
}

/// Stream the local archive into the source code bucket and return the object key
///
/// The file is closed when this returns, whether or not the upload succeeded.
pub async fn upload_archive(uploader: &dyn ArtifactUploader, settings: &Settings) -> Result<String> {
  let key = settings.archive_key().with_context(|| {
    format!(
      "Could not derive object key from source zip path {}",
      settings.archive_path.display()
    )
  })?;
  let mut file = File::open(&settings.archive_path)
    .await
    .with_context(|| format!("Could not load source zip {}", settings.archive_path.display()))?;

  uploader
    .upload(&settings.source_bucket, &key, &mut file)
    .await
    .context("Could not upload source zip")?;
  info!("Uploaded {} to s3://{}/{key}", settings.archive_path.display(), settings.source_bucket);

  Ok(key)
}
