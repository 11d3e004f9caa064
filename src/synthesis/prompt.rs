use crate::llm::{ArticlePayload, SynthesisRequest};
use crate::models::NewsItem;

use super::parse::EVENT_TIME_FORMAT;

pub fn article_payload(news: &NewsItem) -> ArticlePayload {
    ArticlePayload {
        title: news.title.clone(),
        content: news.content.clone(),
        summary: news.summary.clone(),
        description: news.description.clone(),
        source: news.source.clone(),
        category: news.category.clone(),
        published_at: news.published_at.format(EVENT_TIME_FORMAT).to_string(),
    }
}

/// Builds the generation request for one group of related news.
pub fn build_request(group: &[NewsItem], category: &str) -> SynthesisRequest {
    SynthesisRequest {
        articles: group.iter().map(article_payload).collect(),
        instructions: build_instructions(group, category),
    }
}

fn build_instructions(group: &[NewsItem], category: &str) -> String {
    let mut news_content = String::new();
    for (i, news) in group.iter().enumerate() {
        let summary = if news.summary.is_empty() {
            &news.title
        } else {
            &news.summary
        };
        news_content.push_str(&format!(
            "\n新闻{}：\n标题：{}\n摘要：{}\n来源：{}\n",
            i + 1,
            news.title,
            summary,
            news.source
        ));
    }

    format!(
        r#"你是专业的新闻事件分析师。请基于以下{category}主题的新闻，生成一个综合性事件。

相关新闻：{news_content}

要求：
1. 标题：简洁有力，突出核心，不超过25字
2. 描述：全面客观，概括要点，150-250字
3. 内容：详细完整，整合信息，400-800字
4. 标签：提取5-8个相关标签
5. 地点：推断事件主要发生地
6. 时间：估算开始和结束时间，格式为 YYYY-MM-DD HH:MM:SS
7. 置信度：0到1之间，表示这些新闻属于同一事件的把握程度

请返回JSON格式：
{{
  "title": "事件标题",
  "description": "事件描述",
  "content": "详细内容",
  "category": "{category}",
  "tags": ["标签1", "标签2", "标签3"],
  "location": "事件地点",
  "start_time": "2024-01-01 00:00:00",
  "end_time": "2024-01-02 00:00:00",
  "source": "主要来源",
  "author": "AI智能生成",
  "related_links": [],
  "confidence": 0.85
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_request_lists_every_member() {
        let group = vec![
            NewsItem {
                title: "人工智能大会开幕".to_string(),
                source: "新华网".to_string(),
                published_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
                ..NewsItem::default()
            },
            NewsItem {
                title: "人工智能大会闭幕".to_string(),
                summary: "大会顺利闭幕".to_string(),
                source: "人民网".to_string(),
                ..NewsItem::default()
            },
        ];

        let request = build_request(&group, "科技");
        assert_eq!(request.articles.len(), 2);
        assert_eq!(request.articles[0].published_at, "2025-03-01 08:00:00");
        assert!(request.instructions.contains("科技主题"));
        assert!(request.instructions.contains("摘要：人工智能大会开幕"));
        assert!(request.instructions.contains("摘要：大会顺利闭幕"));
        assert!(request.instructions.contains("来源：人民网"));
        assert!(request.instructions.contains("\"category\": \"科技\""));
    }
}
