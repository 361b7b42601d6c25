//! 매니페스트 워커 -- 렌더링된 매니페스트에서 컨테이너 이미지 참조 추출
//!
//! 렌더링 결과는 형태가 제각각인 multi-document YAML입니다. 각 문서를
//! [`WorkloadShape`]로 분류한 뒤, 인식된 형태에서만 이미지를 꺼냅니다.
//!
//! # 규칙
//!
//! - 매핑이 아닌 문서 (스칼라, 리스트, 빈 문서)는 에러 없이 건너뜁니다.
//! - 중복 키는 에러가 아니며 마지막 값이 남습니다.
//! - `metadata.name`이 비어 있으면 해당 문서는 참조를 만들지 않습니다.
//! - `containers`와 `initContainers`를 모두 보며, 컨테이너 이름과 이미지가
//!   둘 다 비어 있지 않을 때만 참조를 만듭니다.
//! - `(scope_path, image)` 단위로 중복을 제거하고 scope 기준으로 안정 정렬합니다.
//! - `CronJob`처럼 pod template이 더 깊이 있는 문서는 인식하지 않으며 경고만 남깁니다.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::Deserialize;
use serde::de::{EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use helmscan_core::metrics as m;
use helmscan_core::types::ImageReference;

use crate::error::WalkError;

/// 이미지 목록을 담는 pod spec 필드
const CONTAINER_FIELDS: [&str; 2] = ["containers", "initContainers"];

/// 중첩 pod spec 탐색 최대 깊이
const MAX_NESTED_DEPTH: usize = 8;

/// 워크로드 문서 형태
#[derive(Debug, Clone, Copy)]
pub enum WorkloadShape<'a> {
    /// `spec.template.spec`에 pod spec이 있는 컨트롤러 (Deployment, StatefulSet, DaemonSet, Job 등)
    PodTemplate(&'a Mapping),
    /// `spec` 자체가 pod spec인 문서 (Pod)
    PodSpec(&'a Mapping),
    /// 그 외 (Service, ConfigMap, CronJob 등)
    Unrecognized,
}

impl<'a> WorkloadShape<'a> {
    /// 문서를 형태별로 분류합니다.
    pub fn classify(doc: &'a Value) -> Self {
        let Some(spec) = doc.get("spec") else {
            return Self::Unrecognized;
        };

        if let Some(pod_spec) = spec
            .get("template")
            .and_then(|t| t.get("spec"))
            .and_then(Value::as_mapping)
        {
            return Self::PodTemplate(pod_spec);
        }

        match spec.as_mapping() {
            Some(pod_spec) if pod_spec.contains_key("containers") => Self::PodSpec(pod_spec),
            _ => Self::Unrecognized,
        }
    }

    /// 분류된 pod spec을 반환합니다.
    pub fn pod_spec(&self) -> Option<&'a Mapping> {
        match self {
            Self::PodTemplate(spec) | Self::PodSpec(spec) => Some(spec),
            Self::Unrecognized => None,
        }
    }
}

/// 렌더링된 매니페스트에서 이미지 참조를 추출합니다.
///
/// 결과는 `(scope_path, image)` 기준으로 유일하며 scope 순으로 정렬되어 있습니다.
/// 같은 입력에 대해 항상 같은 결과를 반환합니다.
///
/// 중복 키는 마지막 값을 사용합니다. 해석할 수 없는 문서를 만나면 경고를 남기고
/// 스트림 읽기를 멈추며, 그 앞의 문서에서 찾은 참조는 그대로 반환합니다.
///
/// # Errors
///
/// 해석된 문서가 하나도 없으면 [`WalkError::InvalidYaml`]을 반환합니다.
pub fn extract_images(manifest: &str) -> Result<Vec<ImageReference>, WalkError> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();
    let mut parsed = 0usize;
    let mut failure = None;

    for (index, document) in serde_yaml::Deserializer::from_str(manifest).enumerate() {
        let doc = match LenientValue::deserialize(document) {
            Ok(LenientValue(doc)) => doc,
            Err(e) => {
                warn!(index, error = %e, "skipping unparseable manifest document");
                metrics::counter!(m::DOCUMENTS_SKIPPED_TOTAL).increment(1);
                failure = Some(WalkError::InvalidYaml {
                    index,
                    reason: e.to_string(),
                });
                // 파서는 구문 오류 뒤의 문서를 이어서 읽지 못합니다.
                break;
            }
        };
        parsed += 1;

        if !doc.is_mapping() {
            debug!(index, "skipping non-mapping document");
            continue;
        }

        for reference in extract_from_document(&doc) {
            if seen.insert(reference.clone()) {
                references.push(reference);
            }
        }
    }

    if let Some(err) = failure.filter(|_| parsed == 0) {
        return Err(err);
    }

    references.sort_by(|a, b| a.scope_path.cmp(&b.scope_path));
    Ok(references)
}

/// 중복 키를 허용하는 YAML 값
///
/// `serde_yaml::Value`는 중복 키를 에러로 처리하지만, 렌더링된 차트에는 같은 라벨이
/// 두 번 들어가는 일이 흔합니다. 같은 키는 마지막 값이 남습니다.
struct LenientValue(Value);

impl<'de> Deserialize<'de> for LenientValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(LenientVisitor)
    }
}

struct LenientVisitor;

impl<'de> Visitor<'de> for LenientVisitor {
    type Value = LenientValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any YAML value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
        Ok(LenientValue(Value::Bool(v)))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(LenientValue(Value::Number(v.into())))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(LenientValue(Value::Number(v.into())))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(LenientValue(Value::Number(v.into())))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
        Ok(LenientValue(Value::String(v.to_owned())))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
        Ok(LenientValue(Value::String(v)))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(LenientValue(Value::Null))
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(LenientValue(Value::Null))
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        LenientValue::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(LenientValue(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(LenientValue(Value::Sequence(items)))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut mapping = Mapping::new();
        while let Some((LenientValue(key), LenientValue(value))) = map.next_entry()? {
            mapping.insert(key, value);
        }
        Ok(LenientValue(Value::Mapping(mapping)))
    }

    fn visit_enum<A>(self, data: A) -> Result<Self::Value, A::Error>
    where
        A: EnumAccess<'de>,
    {
        let (tag, variant) = data.variant::<String>()?;
        let LenientValue(value) = variant.newtype_variant()?;
        Ok(LenientValue(Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(tag),
            value,
        }))))
    }
}

/// 단일 문서에서 이미지 참조를 추출합니다.
fn extract_from_document(doc: &Value) -> Vec<ImageReference> {
    let Some(name) = non_empty_str(doc.get("metadata").and_then(|md| md.get("name"))) else {
        debug!(kind = kind_of(doc), "skipping document without metadata.name");
        return Vec::new();
    };

    let shape = WorkloadShape::classify(doc);
    let Some(pod_spec) = shape.pod_spec() else {
        metrics::counter!(m::DOCUMENTS_SKIPPED_TOTAL).increment(1);
        if doc
            .get("spec")
            .is_some_and(|spec| contains_nested_pod_spec(spec, 0))
        {
            warn!(
                kind = kind_of(doc),
                document = name,
                "pod template nested too deep, images in this document are not scanned"
            );
        }
        return Vec::new();
    };

    let mut references = Vec::new();
    for field in CONTAINER_FIELDS {
        let Some(containers) = pod_spec.get(field).and_then(Value::as_sequence) else {
            continue;
        };
        for container in containers {
            let container_name = non_empty_str(container.get("name"));
            let image = non_empty_str(container.get("image"));
            match (container_name, image) {
                (Some(container_name), Some(image)) => references.push(ImageReference::new(
                    vec![name.to_owned(), container_name.to_owned()],
                    image,
                )),
                _ => debug!(document = name, field, "skipping container without name or image"),
            }
        }
    }
    references
}

/// 워크로드 참조를 고유 이미지 단위로 합칩니다.
///
/// 결과 참조의 `scope_path`는 비어 있으며 이미지 이름 순으로 정렬됩니다.
pub fn unique_images(references: &[ImageReference]) -> Vec<ImageReference> {
    references
        .iter()
        .map(|r| r.image.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(ImageReference::image_only)
        .collect()
}

/// 인식되지 않은 문서 안쪽에 `containers`를 가진 매핑이 있는지 찾습니다.
fn contains_nested_pod_spec(value: &Value, depth: usize) -> bool {
    if depth > MAX_NESTED_DEPTH {
        return false;
    }
    let Some(mapping) = value.as_mapping() else {
        return false;
    };
    if depth > 0 && mapping.contains_key("containers") {
        return true;
    }
    mapping
        .values()
        .any(|child| contains_nested_pod_spec(child, depth + 1))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn kind_of(doc: &Value) -> &str {
    doc.get("kind").and_then(Value::as_str).unwrap_or("<unknown>")
}
