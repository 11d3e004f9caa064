use lazy_static::lazy_static;

/// Bucket for news that matches no topic strongly enough.
pub const OTHER_TOPIC: &str = "其他";

#[derive(Clone, Debug, PartialEq)]
pub struct TopicDefinition {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub description: &'static str,
}

lazy_static! {
    static ref TOPIC_CATALOG: Vec<TopicDefinition> = vec![
        TopicDefinition {
            name: "国内时政",
            keywords: &[
                "政府", "政策", "领导", "会议", "决策", "改革", "发展", "治理", "法律", "法规",
                "中央", "国务院", "党", "两会", "人大", "政协", "监督", "反腐",
            ],
            description: "国内政治、政策、政府决策等相关新闻",
        },
        TopicDefinition {
            name: "国际时政",
            keywords: &[
                "外交", "国际", "全球", "世界", "各国", "峰会", "联合国", "大使", "访问", "合作",
                "协议", "条约", "制裁", "谈判", "关系",
            ],
            description: "国际政治、外交关系、国际组织等相关新闻",
        },
        TopicDefinition {
            name: "生态文明",
            keywords: &[
                "环保", "生态", "绿色", "可持续", "碳排放", "节能", "减排", "污染", "保护", "环境",
                "生物多样性", "森林", "海洋", "湿地", "自然",
            ],
            description: "环境保护、生态建设、绿色发展等相关新闻",
        },
        TopicDefinition {
            name: "群众生活",
            keywords: &[
                "民生", "就业", "教育", "医疗", "养老", "住房", "收入", "福利", "社保", "扶贫",
                "脱贫", "乡村", "农村", "城市", "社区", "服务",
            ],
            description: "民生改善、社会保障、公共服务等相关新闻",
        },
        TopicDefinition {
            name: "军事新闻",
            keywords: &[
                "军事", "国防", "军队", "武器", "装备", "演习", "训练", "安全", "战略", "军工",
                "导弹", "战机", "舰艇", "部队", "军人",
            ],
            description: "军事建设、国防安全、武器装备等相关新闻",
        },
        TopicDefinition {
            name: "国际局势",
            keywords: &[
                "局势", "冲突", "危机", "安全", "战略", "军事", "地缘", "政治", "紧张", "对抗",
                "联盟", "威胁", "稳定", "和平", "争端",
            ],
            description: "国际安全、地缘政治、战略格局等相关新闻",
        },
        TopicDefinition {
            name: "地区冲突",
            keywords: &[
                "巴以", "俄乌", "冲突", "战争", "军事", "袭击", "停火", "和谈", "难民", "人道主义",
                "制裁", "武器", "死伤", "爆炸", "轰炸",
            ],
            description: "巴以冲突、俄乌冲突等地区性军事冲突新闻",
        },
        TopicDefinition {
            name: "科技发展",
            keywords: &[
                "科技", "技术", "创新", "研发", "AI", "人工智能", "5G", "6G", "芯片", "半导体",
                "互联网", "数字", "智能", "算法", "大数据", "云计算", "区块链",
            ],
            description: "科技创新、技术发展、数字化转型等相关新闻",
        },
        TopicDefinition {
            name: "企业动态",
            keywords: &[
                "企业", "公司", "业务", "收购", "合并", "投资", "融资", "上市", "财报", "业绩",
                "管理", "CEO", "董事长", "战略", "转型", "扩张",
            ],
            description: "企业经营、商业活动、公司治理等相关新闻",
        },
        TopicDefinition {
            name: "股票市场",
            keywords: &[
                "股票", "股市", "证券", "交易", "涨跌", "指数", "基金", "投资", "券商", "上证",
                "深证", "创业板", "科创板", "A股", "港股", "美股",
            ],
            description: "股票交易、证券市场、投资理财等相关新闻",
        },
        TopicDefinition {
            name: "财经新闻",
            keywords: &[
                "经济", "金融", "银行", "货币", "通胀", "GDP", "贸易", "进出口", "汇率", "利率",
                "债券", "保险", "财政", "税收", "预算",
            ],
            description: "宏观经济、金融政策、财政税收等相关新闻",
        },
        TopicDefinition {
            name: "娱乐新闻",
            keywords: &[
                "娱乐", "明星", "电影", "电视", "音乐", "演员", "歌手", "导演", "综艺", "颁奖",
                "首映", "演出", "娱乐圈", "八卦", "绯闻",
            ],
            description: "娱乐圈动态、影视音乐、明星新闻等相关内容",
        },
        TopicDefinition {
            name: "游戏新闻",
            keywords: &[
                "游戏", "电竞", "网游", "手游", "主机", "PC", "玩家", "比赛", "赛事", "战队",
                "选手", "游戏公司", "发布", "更新", "版本",
            ],
            description: "游戏产业、电子竞技、游戏产品等相关新闻",
        },
        TopicDefinition {
            name: "气候变化",
            keywords: &[
                "气候", "全球变暖", "温室效应", "极端天气", "自然灾害", "台风", "洪水", "干旱",
                "热浪", "寒潮", "气象", "天气", "温度", "降雨", "降雪",
            ],
            description: "气候变化、极端天气、自然灾害等相关新闻",
        },
    ];
}

/// The static topic catalog, in priority order.
pub fn predefined_topics() -> &'static [TopicDefinition] {
    &TOPIC_CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let names: HashSet<_> = predefined_topics().iter().map(|t| t.name).collect();
        assert_eq!(names.len(), predefined_topics().len());
        assert!(!names.contains(OTHER_TOPIC));
    }

    #[test]
    fn test_every_topic_has_keywords() {
        for topic in predefined_topics() {
            assert!(!topic.keywords.is_empty(), "{} has no keywords", topic.name);
        }
    }
}
